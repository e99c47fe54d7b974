//! Insight notification module
//!
//! Broker plus the SSE surface that delivers "insight ready" events.

mod broker;
mod stream;

pub use broker::{InsightBroker, InsightSubscription};

use crate::state::SharedState;
use axum::{routing::get, Router};

pub fn router() -> Router<SharedState> {
    Router::new().route("/insights/{check_id}/stream", get(stream::stream_insights))
}

//! Alert module

mod handlers;
mod repo;

pub use repo::{Alert, AlertRepo};

use crate::state::SharedState;
use axum::{
    routing::{patch, post},
    Router,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/alerts", post(handlers::create_alert).get(handlers::list_alerts))
        .route("/alerts/{id}/read", patch(handlers::mark_alert_read))
}

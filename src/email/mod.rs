//! Email module
//!
//! Outbox for transactional mail. The repository is in-memory in this
//! snapshot (writes exclusive, reads shared behind one RwLock); delivery is
//! performed by an external sender that drives the status transitions.

mod handlers;
mod repo;

pub use repo::{Email, EmailRepo, EmailStatus};

use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/emails", post(handlers::create_email).get(handlers::list_emails))
        .route("/emails/{id}", get(handlers::get_email))
}

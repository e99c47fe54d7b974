//! Workspace module
//!
//! Roles, membership, per-workspace authorization, and the workspace/member
//! CRUD surface.

mod authz;
mod handlers;
mod membership;
mod repo;
mod role;
pub mod rules;

pub use authz::WorkspaceAuthz;
pub use membership::{
    require_workspace_membership, Membership, OwnerAccess, ReadAccess, WriteAccess,
};
pub use repo::{Member, MemberRepo, Workspace, WorkspaceRepo};
pub use role::Role;

use crate::state::SharedState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};

/// Workspace routes.
///
/// Everything addressing a specific workspace runs behind the membership
/// filter; creation and listing only need the tenant context.
pub fn router(state: SharedState) -> Router<SharedState> {
    let scoped = Router::new()
        .route(
            "/workspaces/{id}",
            get(handlers::get_workspace)
                .patch(handlers::update_workspace)
                .delete(handlers::delete_workspace),
        )
        .route(
            "/workspaces/{id}/members",
            get(handlers::list_members).post(handlers::add_member),
        )
        .route(
            "/workspaces/{id}/members/{user_id}",
            patch(handlers::update_member).delete(handlers::remove_member),
        )
        .route_layer(from_fn_with_state(state, require_workspace_membership));

    Router::new()
        .route(
            "/workspaces",
            post(handlers::create_workspace).get(handlers::list_workspaces),
        )
        .merge(scoped)
}

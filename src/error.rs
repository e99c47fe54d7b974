//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("not a member of this workspace")]
    NotWorkspaceMember,

    #[error("insufficient permissions in this workspace")]
    InsufficientRole,

    #[error("cannot remove yourself from a workspace")]
    CannotRemoveSelf,

    #[error("the workspace owner cannot be removed")]
    CannotRemoveOwner,

    #[error("cannot change your own role")]
    CannotChangeOwnRole,

    #[error("workspace is not owned by this user")]
    WorkspaceNotOwned,

    /// Surfaced as 403 rather than 404 so tenants cannot be enumerated.
    #[error("no tenant is provisioned for this organization")]
    TenantNotFound,

    #[error("workspace not found")]
    WorkspaceNotFound,

    #[error("member not found")]
    MemberNotFound,

    #[error("email not found")]
    EmailNotFound,

    #[error("{0} not found")]
    NotFound(String),

    #[error("user is already a member of this workspace")]
    MemberAlreadyExists,

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code this error surfaces as
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotWorkspaceMember
            | AppError::InsufficientRole
            | AppError::CannotRemoveSelf
            | AppError::CannotRemoveOwner
            | AppError::CannotChangeOwnRole
            | AppError::WorkspaceNotOwned
            | AppError::TenantNotFound => StatusCode::FORBIDDEN,
            AppError::WorkspaceNotFound
            | AppError::MemberNotFound
            | AppError::EmailNotFound
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MemberAlreadyExists | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response body: `{"error": "<message>"}`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Infrastructure failures get logged in full and surfaced generically.
        let message = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                "a database error occurred".to_string()
            }
            AppError::Pool(e) => {
                error!("Pool error: {:?}", e);
                "a database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unauthorized_maps_to_401() {
        assert_eq!(
            AppError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn authorization_failures_map_to_403() {
        for err in [
            AppError::NotWorkspaceMember,
            AppError::InsufficientRole,
            AppError::CannotRemoveSelf,
            AppError::CannotRemoveOwner,
            AppError::CannotChangeOwnRole,
            AppError::WorkspaceNotOwned,
        ] {
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn tenant_not_found_maps_to_403_not_404() {
        // 404 would leak which organizations exist.
        assert_eq!(AppError::TenantNotFound.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn not_found_maps_to_404() {
        for err in [
            AppError::WorkspaceNotFound,
            AppError::MemberNotFound,
            AppError::EmailNotFound,
            AppError::NotFound("alert".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(
            AppError::MemberAlreadyExists.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn insufficient_role_message_is_stable() {
        // Clients match on this message verbatim.
        assert_eq!(
            AppError::InsufficientRole.to_string(),
            "insufficient permissions in this workspace"
        );
    }
}

//! Workspace membership filters
//!
//! Links 4 and 5 of the request pipeline. The membership filter reads the
//! caller's role from the tenant's `workspace_members` and attaches it; the
//! access extractors gate handlers on a minimum role.

use crate::error::AppError;
use crate::state::SharedState;
use crate::tenant::TenantSchema;
use crate::workspace::Role;
use axum::{
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The caller's membership in the workspace addressed by the request
#[derive(Debug, Clone)]
pub struct Membership {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

/// Read the caller's role for the workspace in the `id` path parameter and
/// attach a [`Membership`].
///
/// Must run after the tenant filter: reading `workspace_members` without a
/// pinned schema would hit whatever namespace the pooled connection last
/// served.
pub async fn require_workspace_membership(
    State(state): State<SharedState>,
    params: RawPathParams,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let workspace_id = params
        .iter()
        .find(|(name, _)| *name == "id")
        .map(|(_, value)| value)
        .ok_or_else(|| AppError::Validation("missing workspace id".to_string()))?
        .parse::<Uuid>()
        .map_err(|_| AppError::Validation("invalid workspace id".to_string()))?;

    // Absent tenant means the filter chain was mis-composed; that is a
    // programming error, not an authorization outcome.
    let schema = request
        .extensions()
        .get::<TenantSchema>()
        .cloned()
        .ok_or_else(|| AppError::Validation("tenant not resolved for request".to_string()))?;

    let claims = request
        .extensions()
        .get::<crate::auth::Claims>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Missing authentication context".to_string()))?;

    let member = state
        .members
        .find(&schema, workspace_id, claims.sub)
        .await?
        .ok_or(AppError::NotWorkspaceMember)?;

    request.extensions_mut().insert(Membership {
        workspace_id,
        user_id: claims.sub,
        role: member.role,
    });

    Ok(next.run(request).await)
}

/// Shared body of the minimum-role gate: admits exactly when
/// `rank(role) >= rank(minimum)`.
fn require_minimum_role(parts: &Parts, minimum: Role) -> Result<Membership, AppError> {
    let membership = parts
        .extensions
        .get::<Membership>()
        .cloned()
        .ok_or(AppError::NotWorkspaceMember)?;

    if !membership.role.meets(minimum) {
        return Err(AppError::InsufficientRole);
    }

    Ok(membership)
}

/// Extractor admitting any member (minimum role: viewer)
#[derive(Debug, Clone)]
pub struct ReadAccess(pub Membership);

/// Extractor admitting editors and owners (minimum role: editor)
#[derive(Debug, Clone)]
pub struct WriteAccess(pub Membership);

/// Extractor admitting owners only
#[derive(Debug, Clone)]
pub struct OwnerAccess(pub Membership);

impl<S: Send + Sync> FromRequestParts<S> for ReadAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_minimum_role(parts, Role::Viewer).map(ReadAccess)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for WriteAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_minimum_role(parts, Role::Editor).map(WriteAccess)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for OwnerAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_minimum_role(parts, Role::Owner).map(OwnerAccess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use pretty_assertions::assert_eq;

    fn parts_with_role(role: Option<Role>) -> Parts {
        let mut request = HttpRequest::builder().uri("/").body(()).unwrap();
        if let Some(role) = role {
            request.extensions_mut().insert(Membership {
                workspace_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                role,
            });
        }
        request.into_parts().0
    }

    #[test]
    fn gate_admits_iff_rank_meets_minimum() {
        let all = [Role::Viewer, Role::Editor, Role::Owner];
        for role in all {
            for minimum in all {
                let parts = parts_with_role(Some(role));
                let admitted = require_minimum_role(&parts, minimum).is_ok();
                assert_eq!(
                    admitted,
                    role.rank() >= minimum.rank(),
                    "{role} under minimum {minimum}"
                );
            }
        }
    }

    #[test]
    fn gate_rejects_insufficient_role_with_documented_error() {
        let parts = parts_with_role(Some(Role::Viewer));
        let err = require_minimum_role(&parts, Role::Editor).unwrap_err();
        assert!(matches!(err, AppError::InsufficientRole));
        assert_eq!(err.to_string(), "insufficient permissions in this workspace");
    }

    #[test]
    fn gate_rejects_when_membership_filter_did_not_run() {
        let parts = parts_with_role(None);
        let err = require_minimum_role(&parts, Role::Viewer).unwrap_err();
        assert!(matches!(err, AppError::NotWorkspaceMember));
    }

    #[tokio::test]
    async fn extractors_enforce_their_minimums() {
        let mut parts = parts_with_role(Some(Role::Editor));
        assert!(ReadAccess::from_request_parts(&mut parts, &()).await.is_ok());
        assert!(WriteAccess::from_request_parts(&mut parts, &()).await.is_ok());
        assert!(OwnerAccess::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }
}

//! Tenant filter
//!
//! Third link of the request pipeline: attaches the resolved
//! [`TenantSchema`] so repositories can pin database access.

use crate::auth::Claims;
use crate::error::AppError;
use crate::state::SharedState;
use crate::tenant::{resolve_tenant, Organization, TenantSchema};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Resolve the request's tenant schema and attach it.
///
/// Must run after [`authenticate`](crate::auth::authenticate). Reuses the
/// organization loaded by the organization filter when present; resolves
/// from the claims otherwise, so the filter also works stand-alone.
pub async fn require_tenant(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let schema = match request.extensions().get::<Organization>() {
        Some(org) => TenantSchema::new(org.schema_name.clone())?,
        None => {
            let claims = request
                .extensions()
                .get::<Claims>()
                .cloned()
                .ok_or_else(|| {
                    AppError::Unauthorized("Missing authentication context".to_string())
                })?;
            resolve_tenant(&state.organizations, claims.org).await?
        }
    };

    request.extensions_mut().insert(schema);

    Ok(next.run(request).await)
}

//! Alert route handlers
//!
//! The workspace id arrives in the body or query string rather than the
//! path, so these handlers authorize through the workspace authorization
//! service instead of the membership filter.

use crate::alerts::Alert;
use crate::auth::Claims;
use crate::error::{ApiResult, AppError};
use crate::state::SharedState;
use crate::tenant::TenantSchema;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAlertRequest {
    pub workspace_id: Uuid,
    pub page_id: Uuid,
    pub check_id: Uuid,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 60))]
    pub alert_type: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Stored and returned verbatim
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub workspace_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub page_id: Uuid,
    pub check_id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub title: String,
    pub description: String,
    pub metadata: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Alert> for AlertResponse {
    fn from(a: Alert) -> Self {
        Self {
            id: a.id,
            workspace_id: a.workspace_id,
            page_id: a.page_id,
            check_id: a.check_id,
            alert_type: a.alert_type,
            title: a.title,
            description: a.description,
            metadata: a.metadata,
            read_at: a.read_at,
            created_at: a.created_at,
        }
    }
}

/// Resolve the caller's role in a workspace, mapping absence to the
/// membership error the pipeline would have produced.
async fn role_in_workspace(
    state: &SharedState,
    schema: &TenantSchema,
    workspace_id: Uuid,
    user_id: Uuid,
) -> ApiResult<crate::workspace::Role> {
    state
        .authz
        .role_of(schema, workspace_id, user_id)
        .await
        .map_err(|e| match e {
            AppError::MemberNotFound => AppError::NotWorkspaceMember,
            other => other,
        })
}

/// Record an alert and notify insight subscribers
pub async fn create_alert(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Extension(schema): Extension<TenantSchema>,
    Json(payload): Json<CreateAlertRequest>,
) -> ApiResult<(StatusCode, Json<AlertResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let role = role_in_workspace(&state, &schema, payload.workspace_id, claims.sub).await?;
    if !role.can_write() {
        return Err(AppError::InsufficientRole);
    }

    let alert = state
        .alerts
        .insert(
            &schema,
            payload.workspace_id,
            payload.page_id,
            payload.check_id,
            &payload.alert_type,
            &payload.title,
            &payload.description,
            &payload.metadata,
        )
        .await?;

    info!(
        "Alert created: {} for check {} in workspace {}",
        alert.id, alert.check_id, alert.workspace_id
    );

    let response = AlertResponse::from(alert);

    // The insight computation behind this alert is done; let any waiting
    // SSE subscribers know.
    let payload = serde_json::to_value(&response)
        .map_err(|e| AppError::Internal(format!("Failed to encode alert payload: {}", e)))?;
    state.broker.publish(response.check_id, payload);

    Ok((StatusCode::CREATED, Json(response)))
}

/// List alerts for a workspace
pub async fn list_alerts(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Extension(schema): Extension<TenantSchema>,
    Query(query): Query<ListAlertsQuery>,
) -> ApiResult<Json<Vec<AlertResponse>>> {
    let role = role_in_workspace(&state, &schema, query.workspace_id, claims.sub).await?;
    if !role.can_read() {
        return Err(AppError::InsufficientRole);
    }

    let alerts = state
        .alerts
        .list_for_workspace(&schema, query.workspace_id)
        .await?;

    Ok(Json(alerts.into_iter().map(Into::into).collect()))
}

/// Mark an alert as read (idempotent)
pub async fn mark_alert_read(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Extension(schema): Extension<TenantSchema>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AlertResponse>> {
    let alert = state
        .alerts
        .find(&schema, id)
        .await?
        .ok_or_else(|| AppError::NotFound("alert".to_string()))?;

    role_in_workspace(&state, &schema, alert.workspace_id, claims.sub).await?;

    let alert = state
        .alerts
        .mark_read(&schema, id)
        .await?
        .ok_or_else(|| AppError::NotFound("alert".to_string()))?;

    debug!("Alert marked read: {}", alert.id);

    Ok(Json(alert.into()))
}

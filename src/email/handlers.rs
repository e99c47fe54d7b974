//! Email route handlers

use crate::email::{Email, EmailStatus};
use crate::error::{ApiResult, AppError};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmailRequest {
    #[validate(email)]
    pub recipient: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    pub body: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailResponse {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub status: EmailStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<Email> for EmailResponse {
    fn from(e: Email) -> Self {
        Self {
            id: e.id,
            recipient: e.recipient,
            subject: e.subject,
            status: e.status,
            created_at: e.created_at,
            sent_at: e.sent_at,
        }
    }
}

/// Enqueue an email in the outbox
pub async fn create_email(
    State(state): State<SharedState>,
    Json(payload): Json<CreateEmailRequest>,
) -> ApiResult<(StatusCode, Json<EmailResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let email = state
        .emails
        .insert(&payload.recipient, &payload.subject, &payload.body);

    info!("Email queued: {} to {}", email.id, email.recipient);

    Ok((StatusCode::CREATED, Json(email.into())))
}

/// List queued and delivered emails
pub async fn list_emails(State(state): State<SharedState>) -> ApiResult<Json<Vec<EmailResponse>>> {
    Ok(Json(state.emails.list().into_iter().map(Into::into).collect()))
}

/// Fetch one email by id
pub async fn get_email(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EmailResponse>> {
    let email = state.emails.get(id).ok_or(AppError::EmailNotFound)?;
    Ok(Json(email.into()))
}

//! Alert repository
//!
//! Alerts are append-only; the only mutation is marking one as read, and
//! `read_at` is set exactly once.

use crate::db::TenantDb;
use crate::error::AppError;
use crate::tenant::TenantSchema;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Alert {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub page_id: Uuid,
    pub check_id: Uuid,
    pub alert_type: String,
    pub title: String,
    pub description: String,
    pub metadata: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            workspace_id: row.get("workspace_id"),
            page_id: row.get("page_id"),
            check_id: row.get("check_id"),
            alert_type: row.get("alert_type"),
            title: row.get("title"),
            description: row.get("description"),
            metadata: row.get("metadata"),
            read_at: row.get("read_at"),
            created_at: row.get("created_at"),
        }
    }
}

const ALERT_COLUMNS: &str =
    "id, workspace_id, page_id, check_id, alert_type, title, description, metadata, read_at, created_at";

#[derive(Clone)]
pub struct AlertRepo {
    db: TenantDb,
}

impl AlertRepo {
    pub fn new(db: TenantDb) -> Self {
        Self { db }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        page_id: Uuid,
        check_id: Uuid,
        alert_type: &str,
        title: &str,
        description: &str,
        metadata: &serde_json::Value,
    ) -> Result<Alert, AppError> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_one(
                &format!(
                    "INSERT INTO alerts (id, workspace_id, page_id, check_id, alert_type, title, description, metadata, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                     RETURNING {ALERT_COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &workspace_id,
                    &page_id,
                    &check_id,
                    &alert_type,
                    &title,
                    &description,
                    &metadata,
                    &Utc::now(),
                ],
            )
            .await?;

        Ok(Alert::from_row(&row))
    }

    pub async fn find(&self, schema: &TenantSchema, id: Uuid) -> Result<Option<Alert>, AppError> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_opt(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"),
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(Alert::from_row))
    }

    pub async fn list_for_workspace(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
    ) -> Result<Vec<Alert>, AppError> {
        let client = self.db.conn(schema).await?;

        let rows = client
            .query(
                &format!(
                    "SELECT {ALERT_COLUMNS} FROM alerts
                     WHERE workspace_id = $1
                     ORDER BY created_at DESC"
                ),
                &[&workspace_id],
            )
            .await?;

        Ok(rows.iter().map(Alert::from_row).collect())
    }

    /// Set `read_at` if it is still unset; already-read alerts are returned
    /// unchanged (the operation is idempotent).
    pub async fn mark_read(
        &self,
        schema: &TenantSchema,
        id: Uuid,
    ) -> Result<Option<Alert>, AppError> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_opt(
                &format!(
                    "UPDATE alerts SET read_at = $1
                     WHERE id = $2 AND read_at IS NULL
                     RETURNING {ALERT_COLUMNS}"
                ),
                &[&Utc::now(), &id],
            )
            .await?;

        if let Some(row) = row {
            return Ok(Some(Alert::from_row(&row)));
        }

        // Nothing updated: either absent or already read
        let row = client
            .query_opt(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"),
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(Alert::from_row))
    }
}

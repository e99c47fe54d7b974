//! Dashboard module
//!
//! Tenant-wide aggregates for the dashboard landing view. Counts run under
//! the pinned tenant schema, so one query serves every tenant.

use crate::db::TenantDb;
use crate::error::ApiResult;
use crate::state::SharedState;
use crate::tenant::TenantSchema;
use axum::{
    extract::{Extension, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub workspaces: i64,
    pub alerts: i64,
    pub unread_alerts: i64,
    pub pages: i64,
    pub checks: i64,
    pub insights: i64,
}

#[derive(Clone)]
pub struct DashboardRepo {
    db: TenantDb,
}

impl DashboardRepo {
    pub fn new(db: TenantDb) -> Self {
        Self { db }
    }

    pub async fn stats(&self, schema: &TenantSchema) -> ApiResult<DashboardStats> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_one(
                "SELECT
                   (SELECT COUNT(*) FROM workspaces WHERE deleted_at IS NULL) AS workspaces,
                   (SELECT COUNT(*) FROM alerts) AS alerts,
                   (SELECT COUNT(*) FROM alerts WHERE read_at IS NULL) AS unread_alerts,
                   (SELECT COUNT(*) FROM pages) AS pages,
                   (SELECT COUNT(*) FROM checks) AS checks,
                   (SELECT COUNT(*) FROM insights) AS insights",
                &[],
            )
            .await?;

        Ok(DashboardStats {
            workspaces: row.get("workspaces"),
            alerts: row.get("alerts"),
            unread_alerts: row.get("unread_alerts"),
            pages: row.get("pages"),
            checks: row.get("checks"),
            insights: row.get("insights"),
        })
    }
}

async fn get_stats(
    State(state): State<SharedState>,
    Extension(schema): Extension<TenantSchema>,
) -> ApiResult<Json<DashboardStats>> {
    let stats = state.dashboard.stats(&schema).await?;
    Ok(Json(stats))
}

pub fn router() -> Router<SharedState> {
    Router::new().route("/dashboard/stats", get(get_stats))
}

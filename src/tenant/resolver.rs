//! Tenant resolution
//!
//! Maps an authenticated user's organization to its tenant schema.

use crate::db::TenantDb;
use crate::error::AppError;
use crate::tenant::TenantSchema;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Organization record from the shared `public` schema
#[derive(Debug, Clone)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub schema_name: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Repository over `public.organizations`
#[derive(Clone)]
pub struct OrganizationRepo {
    db: TenantDb,
}

impl OrganizationRepo {
    pub fn new(db: TenantDb) -> Self {
        Self { db }
    }

    /// Find an organization that has not been soft-deleted
    pub async fn find_active(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        let client = self.db.shared_conn().await?;

        let row = client
            .query_opt(
                "SELECT id, name, schema_name, created_at, deleted_at
                 FROM public.organizations
                 WHERE id = $1 AND deleted_at IS NULL",
                &[&id],
            )
            .await?;

        Ok(row.map(|r| Organization {
            id: r.get("id"),
            name: r.get("name"),
            schema_name: r.get("schema_name"),
            created_at: r.get("created_at"),
            deleted_at: r.get("deleted_at"),
        }))
    }

    /// Schema names of every active organization, for tenant-wide migration
    /// runs. Each name is validated before it is handed out.
    pub async fn active_schemas(&self) -> Result<Vec<TenantSchema>, AppError> {
        let client = self.db.shared_conn().await?;

        let rows = client
            .query(
                "SELECT schema_name FROM public.organizations
                 WHERE deleted_at IS NULL
                 ORDER BY schema_name",
                &[],
            )
            .await?;

        rows.into_iter()
            .map(|r| TenantSchema::new(r.get::<_, String>("schema_name")))
            .collect()
    }
}

/// Resolve the tenant schema for an organization.
///
/// Missing or soft-deleted organizations yield [`AppError::TenantNotFound`],
/// a 403, so tenant existence is not observable. An organization row
/// carrying an unsafe schema name is a provisioning bug and fails as 500.
pub async fn resolve_tenant(
    organizations: &OrganizationRepo,
    org_id: Uuid,
) -> Result<TenantSchema, AppError> {
    let org = organizations
        .find_active(org_id)
        .await?
        .ok_or(AppError::TenantNotFound)?;

    TenantSchema::new(org.schema_name)
}

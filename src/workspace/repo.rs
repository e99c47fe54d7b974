//! Workspace and member repositories
//!
//! Every operation acquires a schema-pinned connection, runs its statements
//! on it, and releases it. Tables are unqualified on purpose: they resolve
//! inside the pinned tenant schema.

use crate::db::TenantDb;
use crate::error::AppError;
use crate::tenant::TenantSchema;
use crate::workspace::Role;
use chrono::{DateTime, Utc};
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use uuid::Uuid;

/// Workspace record from a tenant schema
#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub workspace_type: String,
    pub tags: Vec<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Workspace {
    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            workspace_type: row.get("workspace_type"),
            tags: row.get("tags"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            deleted_at: row.get("deleted_at"),
        }
    }
}

/// Workspace member record from a tenant schema
#[derive(Debug, Clone)]
pub struct Member {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub invited_by: Option<Uuid>,
    pub invited_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}

impl Member {
    fn from_row(row: &Row) -> Self {
        Self {
            workspace_id: row.get("workspace_id"),
            user_id: row.get("user_id"),
            role: row.get("role"),
            invited_by: row.get("invited_by"),
            invited_at: row.get("invited_at"),
            removed_at: row.get("removed_at"),
        }
    }
}

const WORKSPACE_COLUMNS: &str =
    "id, name, workspace_type, tags, created_by, created_at, updated_at, deleted_at";

const MEMBER_COLUMNS: &str = "workspace_id, user_id, role, invited_by, invited_at, removed_at";

/// Repository over `workspaces`
#[derive(Clone)]
pub struct WorkspaceRepo {
    db: TenantDb,
}

impl WorkspaceRepo {
    pub fn new(db: TenantDb) -> Self {
        Self { db }
    }

    /// Create a workspace with its creator as owner member, atomically
    pub async fn create(
        &self,
        schema: &TenantSchema,
        name: &str,
        workspace_type: &str,
        tags: &[String],
        created_by: Uuid,
    ) -> Result<Workspace, AppError> {
        let mut client = self.db.conn(schema).await?;
        let txn = client.transaction().await?;

        let now = Utc::now();
        let id = Uuid::new_v4();

        let row = txn
            .query_one(
                &format!(
                    "INSERT INTO workspaces (id, name, workspace_type, tags, created_by, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $6)
                     RETURNING {WORKSPACE_COLUMNS}"
                ),
                &[&id, &name, &workspace_type, &tags, &created_by, &now],
            )
            .await?;

        txn.execute(
            "INSERT INTO workspace_members (workspace_id, user_id, role, invited_by, invited_at)
             VALUES ($1, $2, $3, NULL, $4)",
            &[&id, &created_by, &Role::Owner, &now],
        )
        .await?;

        txn.commit().await?;

        Ok(Workspace::from_row(&row))
    }

    /// Find a live workspace by id
    pub async fn find(
        &self,
        schema: &TenantSchema,
        id: Uuid,
    ) -> Result<Option<Workspace>, AppError> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_opt(
                &format!(
                    "SELECT {WORKSPACE_COLUMNS} FROM workspaces
                     WHERE id = $1 AND deleted_at IS NULL"
                ),
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(Workspace::from_row))
    }

    /// List live workspaces where the user is an active member
    pub async fn list_for_user(
        &self,
        schema: &TenantSchema,
        user_id: Uuid,
    ) -> Result<Vec<Workspace>, AppError> {
        let client = self.db.conn(schema).await?;

        let rows = client
            .query(
                &format!(
                    "SELECT {WORKSPACE_COLUMNS} FROM workspaces w
                     JOIN workspace_members m ON m.workspace_id = w.id
                     WHERE m.user_id = $1
                       AND m.removed_at IS NULL
                       AND w.deleted_at IS NULL
                     ORDER BY w.created_at DESC"
                ),
                &[&user_id],
            )
            .await?;

        Ok(rows.iter().map(Workspace::from_row).collect())
    }

    /// Partial update; untouched fields keep their value
    pub async fn update(
        &self,
        schema: &TenantSchema,
        id: Uuid,
        name: Option<&str>,
        workspace_type: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<Option<Workspace>, AppError> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_opt(
                &format!(
                    "UPDATE workspaces
                     SET name = COALESCE($1, name),
                         workspace_type = COALESCE($2, workspace_type),
                         tags = COALESCE($3, tags),
                         updated_at = $4
                     WHERE id = $5 AND deleted_at IS NULL
                     RETURNING {WORKSPACE_COLUMNS}"
                ),
                &[&name, &workspace_type, &tags, &Utc::now(), &id],
            )
            .await?;

        Ok(row.as_ref().map(Workspace::from_row))
    }

    /// Soft-delete; returns false when the workspace was already gone
    pub async fn soft_delete(&self, schema: &TenantSchema, id: Uuid) -> Result<bool, AppError> {
        let client = self.db.conn(schema).await?;

        let affected = client
            .execute(
                "UPDATE workspaces SET deleted_at = $1
                 WHERE id = $2 AND deleted_at IS NULL",
                &[&Utc::now(), &id],
            )
            .await?;

        Ok(affected > 0)
    }
}

/// Repository over `workspace_members`
#[derive(Clone)]
pub struct MemberRepo {
    db: TenantDb,
}

impl MemberRepo {
    pub fn new(db: TenantDb) -> Self {
        Self { db }
    }

    /// Find the active membership of a user in a workspace
    pub async fn find(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Member>, AppError> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_opt(
                &format!(
                    "SELECT {MEMBER_COLUMNS} FROM workspace_members
                     WHERE workspace_id = $1 AND user_id = $2 AND removed_at IS NULL"
                ),
                &[&workspace_id, &user_id],
            )
            .await?;

        Ok(row.as_ref().map(Member::from_row))
    }

    /// List active members of a workspace
    pub async fn list(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
    ) -> Result<Vec<Member>, AppError> {
        let client = self.db.conn(schema).await?;

        let rows = client
            .query(
                &format!(
                    "SELECT {MEMBER_COLUMNS} FROM workspace_members
                     WHERE workspace_id = $1 AND removed_at IS NULL
                     ORDER BY invited_at"
                ),
                &[&workspace_id],
            )
            .await?;

        Ok(rows.iter().map(Member::from_row).collect())
    }

    /// Add a member; duplicate active membership is a conflict
    pub async fn insert(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
        role: Role,
        invited_by: Uuid,
    ) -> Result<Member, AppError> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_one(
                &format!(
                    "INSERT INTO workspace_members (workspace_id, user_id, role, invited_by, invited_at)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING {MEMBER_COLUMNS}"
                ),
                &[&workspace_id, &user_id, &role, &invited_by, &Utc::now()],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::MemberAlreadyExists
                } else {
                    AppError::Database(e)
                }
            })?;

        Ok(Member::from_row(&row))
    }

    /// Change the role of an active member
    pub async fn update_role(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<Member>, AppError> {
        let client = self.db.conn(schema).await?;

        let row = client
            .query_opt(
                &format!(
                    "UPDATE workspace_members SET role = $1
                     WHERE workspace_id = $2 AND user_id = $3 AND removed_at IS NULL
                     RETURNING {MEMBER_COLUMNS}"
                ),
                &[&role, &workspace_id, &user_id],
            )
            .await?;

        Ok(row.as_ref().map(Member::from_row))
    }

    /// Soft-remove a member; returns false when no active membership existed
    pub async fn soft_remove(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let client = self.db.conn(schema).await?;

        let affected = client
            .execute(
                "UPDATE workspace_members SET removed_at = $1
                 WHERE workspace_id = $2 AND user_id = $3 AND removed_at IS NULL",
                &[&Utc::now(), &workspace_id, &user_id],
            )
            .await?;

        Ok(affected > 0)
    }
}

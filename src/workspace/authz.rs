//! Per-workspace authorization service
//!
//! Role checks for use-cases that sit outside the HTTP filter chain, such as
//! handlers whose workspace id arrives in the request body or
//! server-initiated actions. Absence of a membership is a plain `false` for
//! the boolean predicates; only [`WorkspaceAuthz::role_of`] treats it as an
//! error, because the caller asked for the role explicitly.

use crate::error::AppError;
use crate::tenant::TenantSchema;
use crate::workspace::{MemberRepo, Role};
use uuid::Uuid;

#[derive(Clone)]
pub struct WorkspaceAuthz {
    members: MemberRepo,
}

impl WorkspaceAuthz {
    pub fn new(members: MemberRepo) -> Self {
        Self { members }
    }

    async fn role(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Role>, AppError> {
        Ok(self
            .members
            .find(schema, workspace_id, user_id)
            .await?
            .map(|m| m.role))
    }

    pub async fn can_read(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .role(schema, workspace_id, user_id)
            .await?
            .map(|r| r.can_read())
            .unwrap_or(false))
    }

    pub async fn can_write(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .role(schema, workspace_id, user_id)
            .await?
            .map(|r| r.can_write())
            .unwrap_or(false))
    }

    pub async fn can_delete(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .role(schema, workspace_id, user_id)
            .await?
            .map(|r| r.can_delete())
            .unwrap_or(false))
    }

    pub async fn can_manage_members(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .role(schema, workspace_id, user_id)
            .await?
            .map(|r| r.can_manage_members())
            .unwrap_or(false))
    }

    /// The user's role in the workspace; [`AppError::MemberNotFound`] when
    /// they are not an active member.
    pub async fn role_of(
        &self,
        schema: &TenantSchema,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Role, AppError> {
        self.role(schema, workspace_id, user_id)
            .await?
            .ok_or(AppError::MemberNotFound)
    }
}

//! Workspace and member route handlers

use crate::auth::Claims;
use crate::error::{ApiResult, AppError};
use crate::state::SharedState;
use crate::tenant::TenantSchema;
use crate::workspace::{rules, Member, OwnerAccess, ReadAccess, Role, Workspace, WriteAccess};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 60))]
    pub workspace_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWorkspaceRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 60))]
    pub workspace_type: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    /// Parsed case-insensitively; anything outside the role set is a 400
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub workspace_type: String,
    pub tags: Vec<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Workspace> for WorkspaceResponse {
    fn from(w: Workspace) -> Self {
        Self {
            id: w.id,
            name: w.name,
            workspace_type: w.workspace_type,
            tags: w.tags,
            created_by: w.created_by,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub invited_by: Option<Uuid>,
    pub invited_at: DateTime<Utc>,
}

impl From<Member> for MemberResponse {
    fn from(m: Member) -> Self {
        Self {
            workspace_id: m.workspace_id,
            user_id: m.user_id,
            role: m.role,
            invited_by: m.invited_by,
            invited_at: m.invited_at,
        }
    }
}

/// Create a workspace; the creator becomes its owner
pub async fn create_workspace(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Extension(schema): Extension<TenantSchema>,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> ApiResult<(StatusCode, Json<WorkspaceResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let workspace = state
        .workspaces
        .create(
            &schema,
            &payload.name,
            &payload.workspace_type,
            &payload.tags,
            claims.sub,
        )
        .await?;

    info!("Workspace created: {} ({})", workspace.name, workspace.id);

    Ok((StatusCode::CREATED, Json(workspace.into())))
}

/// List workspaces where the caller is an active member
pub async fn list_workspaces(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Extension(schema): Extension<TenantSchema>,
) -> ApiResult<Json<Vec<WorkspaceResponse>>> {
    let workspaces = state.workspaces.list_for_user(&schema, claims.sub).await?;

    Ok(Json(workspaces.into_iter().map(Into::into).collect()))
}

/// Fetch a single workspace
pub async fn get_workspace(
    State(state): State<SharedState>,
    Extension(schema): Extension<TenantSchema>,
    ReadAccess(membership): ReadAccess,
) -> ApiResult<Json<WorkspaceResponse>> {
    let workspace = state
        .workspaces
        .find(&schema, membership.workspace_id)
        .await?
        .ok_or(AppError::WorkspaceNotFound)?;

    Ok(Json(workspace.into()))
}

/// Partially update a workspace
pub async fn update_workspace(
    State(state): State<SharedState>,
    Extension(schema): Extension<TenantSchema>,
    WriteAccess(membership): WriteAccess,
    Json(payload): Json<UpdateWorkspaceRequest>,
) -> ApiResult<Json<WorkspaceResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let workspace = state
        .workspaces
        .update(
            &schema,
            membership.workspace_id,
            payload.name.as_deref(),
            payload.workspace_type.as_deref(),
            payload.tags.as_deref(),
        )
        .await?
        .ok_or(AppError::WorkspaceNotFound)?;

    debug!("Workspace updated: {}", workspace.id);

    Ok(Json(workspace.into()))
}

/// Soft-delete a workspace
pub async fn delete_workspace(
    State(state): State<SharedState>,
    Extension(schema): Extension<TenantSchema>,
    OwnerAccess(membership): OwnerAccess,
) -> ApiResult<StatusCode> {
    // Belt-and-braces ownership re-check through the authorization service;
    // the filter chain already established owner access.
    let owned = state
        .authz
        .can_delete(&schema, membership.workspace_id, membership.user_id)
        .await?;
    if !owned {
        return Err(AppError::WorkspaceNotOwned);
    }

    let deleted = state
        .workspaces
        .soft_delete(&schema, membership.workspace_id)
        .await?;
    if !deleted {
        return Err(AppError::WorkspaceNotFound);
    }

    info!("Workspace deleted: {}", membership.workspace_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Invite a user into the workspace
pub async fn add_member(
    State(state): State<SharedState>,
    Extension(schema): Extension<TenantSchema>,
    OwnerAccess(membership): OwnerAccess,
    Json(payload): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<MemberResponse>)> {
    let role = Role::parse(&payload.role)?;
    rules::ensure_invitable(role)?;

    let member = state
        .members
        .insert(
            &schema,
            membership.workspace_id,
            payload.user_id,
            role,
            membership.user_id,
        )
        .await?;

    info!(
        "Member {} added to workspace {} as {}",
        member.user_id, member.workspace_id, member.role
    );

    Ok((StatusCode::CREATED, Json(member.into())))
}

/// List active members of the workspace
pub async fn list_members(
    State(state): State<SharedState>,
    Extension(schema): Extension<TenantSchema>,
    ReadAccess(membership): ReadAccess,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let members = state.members.list(&schema, membership.workspace_id).await?;

    Ok(Json(members.into_iter().map(Into::into).collect()))
}

/// Change a member's role
pub async fn update_member(
    State(state): State<SharedState>,
    Extension(schema): Extension<TenantSchema>,
    OwnerAccess(membership): OwnerAccess,
    Path((_, target_user)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMemberRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let new_role = Role::parse(&payload.role)?;

    let target = state
        .members
        .find(&schema, membership.workspace_id, target_user)
        .await?
        .ok_or(AppError::MemberNotFound)?;

    rules::ensure_role_changeable(membership.user_id, target_user, target.role, new_role)?;

    let member = state
        .members
        .update_role(&schema, membership.workspace_id, target_user, new_role)
        .await?
        .ok_or(AppError::MemberNotFound)?;

    info!(
        "Member {} role changed to {} in workspace {}",
        target_user, new_role, membership.workspace_id
    );

    Ok(Json(member.into()))
}

/// Remove a member from the workspace
pub async fn remove_member(
    State(state): State<SharedState>,
    Extension(schema): Extension<TenantSchema>,
    OwnerAccess(membership): OwnerAccess,
    Path((_, target_user)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let target = state
        .members
        .find(&schema, membership.workspace_id, target_user)
        .await?
        .ok_or(AppError::MemberNotFound)?;

    rules::ensure_member_removable(membership.user_id, target_user, target.role)?;

    let removed = state
        .members
        .soft_remove(&schema, membership.workspace_id, target_user)
        .await?;
    if !removed {
        return Err(AppError::MemberNotFound);
    }

    info!(
        "Member {} removed from workspace {}",
        target_user, membership.workspace_id
    );

    Ok(StatusCode::NO_CONTENT)
}

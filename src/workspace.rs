// src/workspace.rs

use std::sync::LazyLock;

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::error::ApiError;
use crate::models::{User, Workspace, WorkspaceMember, WorkspaceRole};
use crate::project::ProjectDetail;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Debug, Serialize)]
pub struct WorkspaceMemberWithUser {
    #[serde(flatten)]
    pub member: WorkspaceMember,
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceDetail {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub members: Vec<WorkspaceMemberWithUser>,
    pub projects: Vec<ProjectDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub email: String,
    pub role: WorkspaceRole,
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// GET /api/workspaces
/// Every workspace the caller belongs to, with members and projects.
pub async fn get_user_workspaces(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    let store = data.store.as_ref();

    let mut workspaces = Vec::new();
    for workspace in store.workspaces_for_user(&current_user).await? {
        let mut members = Vec::new();
        for member in store.workspace_members(&workspace.id).await? {
            let user = store.find_user(&member.user_id).await?;
            members.push(WorkspaceMemberWithUser { member, user });
        }
        let mut projects = Vec::new();
        for project in store.projects_in_workspace(&workspace.id).await? {
            projects.push(ProjectDetail::load(store, project).await?);
        }
        workspaces.push(WorkspaceDetail {
            workspace,
            members,
            projects,
        });
    }
    debug!("{} workspaces for {}", workspaces.len(), current_user);

    Ok(HttpResponse::Ok().json(json!({ "workspaces": workspaces })))
}

/// POST /api/workspaces/add-member
/// Adds an existing user to a workspace. Workspace admins only.
pub async fn add_member(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    let payload = payload.into_inner();
    let store = data.store.as_ref();
    let email = payload.email.trim();

    if !EMAIL.is_match(email) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    let user = store
        .find_user_by_email(email)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    let workspace_id = payload
        .workspace_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Workspace ID is required".to_string()))?;
    let workspace = store
        .find_workspace(&workspace_id)
        .await?
        .ok_or(ApiError::NotFound("Workspace not found"))?;

    let is_admin = matches!(
        store.find_workspace_member(&workspace.id, &current_user).await?,
        Some(member) if member.role == WorkspaceRole::Admin
    );
    if !is_admin {
        return Err(ApiError::Unauthorized("You don't have admin privileges"));
    }

    if store
        .find_workspace_member(&workspace.id, &user.id)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest("User is already a member".to_string()));
    }

    let member = WorkspaceMember {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        workspace_id: workspace.id.clone(),
        role: payload.role,
        message: payload.message,
    };
    store.add_workspace_member(&member).await?;
    info!("User {} added to workspace {} as {:?}", user.id, workspace.id, member.role);

    Ok(HttpResponse::Ok().json(json!({ "member": member, "message": "Member added successfully" })))
}

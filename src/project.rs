// src/project.rs

use std::collections::HashSet;

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::error::ApiError;
use crate::models::{
    client_date, Priority, Project, ProjectMember, ProjectStatus, User, WorkspaceRole,
};
use crate::store::{Store, StoreError};
use crate::task::TaskWithAssignee;

#[derive(Debug, Serialize)]
pub struct ProjectMemberWithUser {
    #[serde(flatten)]
    pub member: ProjectMember,
    pub user: Option<User>,
}

/// A project with its members and tasks, as listed to clients.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMemberWithUser>,
    pub tasks: Vec<TaskWithAssignee>,
}

impl ProjectDetail {
    pub async fn load(store: &dyn Store, project: Project) -> Result<Self, StoreError> {
        let mut members = Vec::new();
        for member in store.project_members(&project.id).await? {
            let user = store.find_user(&member.user_id).await?;
            members.push(ProjectMemberWithUser { member, user });
        }
        let mut tasks = Vec::new();
        for task in store.tasks_in_project(&project.id).await? {
            tasks.push(TaskWithAssignee::load(store, task).await?);
        }
        Ok(Self {
            project,
            members,
            tasks,
        })
    }
}

pub async fn is_project_member(
    store: &dyn Store,
    project_id: &str,
    user_id: &str,
) -> Result<bool, StoreError> {
    Ok(store
        .project_members(project_id)
        .await?
        .iter()
        .any(|m| m.user_id == user_id))
}

async fn is_workspace_admin(
    store: &dyn Store,
    workspace_id: &str,
    user_id: &str,
) -> Result<bool, StoreError> {
    Ok(matches!(
        store.find_workspace_member(workspace_id, user_id).await?,
        Some(member) if member.role == WorkspaceRole::Admin
    ))
}

fn check_progress(progress: Option<u8>) -> Result<(), ApiError> {
    match progress {
        Some(p) if p > 100 => Err(ApiError::BadRequest(
            "Progress must be between 0 and 100".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(rename = "start_date", default, deserialize_with = "client_date::option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "end_date", default, deserialize_with = "client_date::option")]
    pub end_date: Option<DateTime<Utc>>,
    /// Email of the team lead.
    #[serde(rename = "team_lead")]
    pub team_lead: String,
    /// Emails of the initial members.
    #[serde(rename = "team_members", default)]
    pub team_members: Vec<String>,
    pub progress: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    #[serde(rename = "start_date", default, deserialize_with = "client_date::option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "end_date", default, deserialize_with = "client_date::option")]
    pub end_date: Option<DateTime<Utc>>,
    pub progress: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct AddProjectMemberRequest {
    pub email: String,
}

/// POST /api/projects
/// Creates a project in a workspace. Only workspace admins may do so.
pub async fn create_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    debug!("create_project by {} with payload: {:?}", current_user, payload);
    let payload = payload.into_inner();
    let store = data.store.as_ref();

    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name is required".to_string()));
    }
    check_progress(payload.progress)?;

    store
        .find_workspace(&payload.workspace_id)
        .await?
        .ok_or(ApiError::NotFound("Workspace not found"))?;
    if !is_workspace_admin(store, &payload.workspace_id, &current_user).await? {
        return Err(ApiError::Forbidden(
            "You don't have permission to create projects in this workspace",
        ));
    }

    let team_lead = store
        .find_user_by_email(&payload.team_lead)
        .await?
        .ok_or(ApiError::NotFound("Team lead not found"))?;
    if store
        .find_workspace_member(&payload.workspace_id, &team_lead.id)
        .await?
        .is_none()
    {
        return Err(ApiError::BadRequest(
            "Team lead must be a member of this workspace".to_string(),
        ));
    }

    let project = Project {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        description: payload.description,
        priority: payload.priority,
        status: payload.status,
        start_date: payload.start_date,
        end_date: payload.end_date,
        team_lead: team_lead.id,
        workspace_id: payload.workspace_id,
        progress: payload.progress.unwrap_or(0),
        created_at: Utc::now(),
    };
    store.create_project(&project).await?;
    info!("Project {} created in workspace {}", project.id, project.workspace_id);

    // Only listed emails that belong to workspace members join the project.
    let mut added = HashSet::new();
    for email in &payload.team_members {
        let Some(user) = store.find_user_by_email(email).await? else {
            continue;
        };
        if !added.insert(user.id.clone()) {
            continue;
        }
        if store
            .find_workspace_member(&project.workspace_id, &user.id)
            .await?
            .is_none()
        {
            continue;
        }
        store
            .add_project_member(&ProjectMember {
                id: Uuid::new_v4().to_string(),
                user_id: user.id,
                project_id: project.id.clone(),
            })
            .await?;
    }

    let project = ProjectDetail::load(store, project).await?;
    Ok(HttpResponse::Ok().json(json!({ "project": project, "message": "Project created successfully" })))
}

/// PUT /api/projects
/// Workspace admins and the project's team lead may update it.
pub async fn update_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<UpdateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    let payload = payload.into_inner();
    let store = data.store.as_ref();
    check_progress(payload.progress)?;

    let mut project = store
        .find_project(&payload.id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;

    if project.team_lead != current_user
        && !is_workspace_admin(store, &project.workspace_id, &current_user).await?
    {
        return Err(ApiError::Forbidden(
            "You don't have permission to update projects in this workspace",
        ));
    }

    if let Some(name) = payload.name.filter(|n| !n.trim().is_empty()) {
        project.name = name;
    }
    if let Some(description) = payload.description {
        project.description = Some(description);
    }
    if let Some(status) = payload.status {
        project.status = status;
    }
    if let Some(priority) = payload.priority {
        project.priority = priority;
    }
    if payload.start_date.is_some() {
        project.start_date = payload.start_date;
    }
    if payload.end_date.is_some() {
        project.end_date = payload.end_date;
    }
    if let Some(progress) = payload.progress {
        project.progress = progress;
    }

    store.update_project(&project).await?;
    info!("Project {} updated by {}", project.id, current_user);

    Ok(HttpResponse::Ok().json(json!({ "project": project, "message": "Project updated successfully" })))
}

/// POST /api/projects/{project_id}/addMember
/// Adds a workspace member to the project. Team lead only.
pub async fn add_project_member(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    payload: web::Json<AddProjectMemberRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    let store = data.store.as_ref();

    let project = store
        .find_project(&project_id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;
    if project.team_lead != current_user {
        return Err(ApiError::NotFound("Only project lead can add members"));
    }

    let user = store
        .find_user_by_email(payload.email.trim())
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    if is_project_member(store, &project.id, &user.id).await? {
        return Err(ApiError::BadRequest("User is already a member".to_string()));
    }
    if store
        .find_workspace_member(&project.workspace_id, &user.id)
        .await?
        .is_none()
    {
        return Err(ApiError::BadRequest(
            "User is not a member of this workspace".to_string(),
        ));
    }

    let member = ProjectMember {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        project_id: project.id.clone(),
    };
    store.add_project_member(&member).await?;
    info!("Added {} to project {}", user.id, project.id);

    let member = ProjectMemberWithUser {
        member,
        user: Some(user),
    };
    Ok(HttpResponse::Ok().json(json!({ "member": member, "message": "Member added successfully" })))
}

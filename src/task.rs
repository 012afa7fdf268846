// src/task.rs

use std::collections::HashSet;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::error::ApiError;
use crate::events::{Event, Publish};
use crate::models::task::{
    CreateTaskRequest, DeleteTasksRequest, UpdateTaskRequest, UpdateTaskStatusRequest,
};
use crate::models::{Task, User};
use crate::project::is_project_member;
use crate::store::{Store, StoreError};

/// A task as returned to clients, with its assignee resolved.
#[derive(Debug, Serialize)]
pub struct TaskWithAssignee {
    #[serde(flatten)]
    pub task: Task,
    pub assignee: Option<User>,
}

impl TaskWithAssignee {
    pub async fn load(store: &dyn Store, task: Task) -> Result<Self, StoreError> {
        let assignee = match &task.assignee_id {
            Some(user_id) => store.find_user(user_id).await?,
            None => None,
        };
        Ok(Self { task, assignee })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/tasks
/// Creates a task. Only the project's team lead may do so, and the assignee
/// (if any) must be a member of the project.
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    debug!("create_task by {} with payload: {:?}", current_user, payload);
    let payload = payload.into_inner();
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let project = data
        .store
        .find_project(&payload.project_id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;

    if project.team_lead != current_user {
        return Err(ApiError::Forbidden("Only project lead can create tasks"));
    }

    let assignee_id = non_empty(payload.assignee_id);
    if let Some(assignee) = &assignee_id {
        if !is_project_member(data.store.as_ref(), &project.id, assignee).await? {
            return Err(ApiError::Forbidden("Assignee is not a member of this project"));
        }
    }

    let task = Task {
        id: Uuid::new_v4().to_string(),
        project_id: project.id.clone(),
        title: payload.title,
        description: non_empty(payload.description),
        task_type: payload.task_type,
        status: payload.status,
        priority: payload.priority,
        assignee_id,
        due_date: payload.due_date,
        created_at: Utc::now(),
    };
    data.store.create_task(&task).await?;
    info!("Task {} created in project {}", task.id, project.id);

    data.events.do_send(Publish(Event::TaskAssigned {
        task_id: task.id.clone(),
        origin,
    }));

    let task = TaskWithAssignee::load(data.store.as_ref(), task).await?;
    Ok(HttpResponse::Ok().json(json!({ "task": task, "message": "Task created successfully" })))
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    let mut update = payload.into_inner();
    // An empty string clears, like null.
    update.assignee_id = update.assignee_id.map(non_empty);
    update.description = update.description.map(non_empty);

    let mut task = data
        .store
        .find_task(&task_id)
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;
    let project = data
        .store
        .find_project(&task.project_id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;

    if project.team_lead != current_user {
        return Err(ApiError::Forbidden("Only project lead can update tasks"));
    }
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    if let Some(Some(assignee)) = &update.assignee_id {
        if !is_project_member(data.store.as_ref(), &project.id, assignee).await? {
            return Err(ApiError::Forbidden("Assignee is not a member of this project"));
        }
    }

    task.apply(&update);
    if !data.store.update_task(&task).await? {
        return Err(ApiError::NotFound("Task not found"));
    }
    info!("Task {} updated by {}", task.id, current_user);

    Ok(HttpResponse::Ok().json(json!({ "task": task, "message": "Task updated successfully" })))
}

/// PUT /api/tasks/{id}/status
/// Status-only update, open to every project member.
pub async fn update_task_status(
    req: HttpRequest,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<UpdateTaskStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;

    let mut task = data
        .store
        .find_task(&task_id)
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;
    let project = data
        .store
        .find_project(&task.project_id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;

    if project.team_lead != current_user
        && !is_project_member(data.store.as_ref(), &project.id, &current_user).await?
    {
        return Err(ApiError::Forbidden("You are not a member of this project"));
    }

    task.status = payload.status;
    if !data.store.update_task(&task).await? {
        return Err(ApiError::NotFound("Task not found"));
    }
    info!("Task {} moved to {:?}", task.id, task.status);

    Ok(HttpResponse::Ok().json(json!({ "task": task, "message": "Task status updated successfully" })))
}

/// POST /api/tasks/delete
/// Deletes every listed task. The caller must lead every project involved.
pub async fn delete_tasks(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<DeleteTasksRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    let task_ids = &payload.task_ids;

    let tasks = if task_ids.is_empty() {
        Vec::new()
    } else {
        data.store.find_tasks(task_ids).await?
    };
    if tasks.is_empty() {
        return Err(ApiError::NotFound("Task not found"));
    }

    let project_ids: HashSet<&str> = tasks.iter().map(|t| t.project_id.as_str()).collect();
    for project_id in project_ids {
        let project = data
            .store
            .find_project(project_id)
            .await?
            .ok_or(ApiError::NotFound("Project not found"))?;
        if project.team_lead != current_user {
            return Err(ApiError::Forbidden("Only project lead can delete tasks"));
        }
    }

    let found: Vec<String> = tasks.into_iter().map(|t| t.id).collect();
    let deleted = data.store.delete_tasks(&found).await?;
    info!("{} tasks deleted by {}", deleted, current_user);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Task deleted successfully",
        "deletedCount": deleted,
    })))
}

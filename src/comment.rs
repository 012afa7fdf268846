// src/comment.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::error::ApiError;
use crate::models::{Comment, User};
use crate::project::is_project_member;

#[derive(Debug, Serialize)]
pub struct CommentWithUser {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub task_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    pub task_id: String,
}

/// POST /api/comments
pub async fn add_comment(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<AddCommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let current_user = current_user(&req)?;
    let payload = payload.into_inner();
    let store = data.store.as_ref();

    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Comment cannot be empty".to_string()));
    }

    let task = store
        .find_task(&payload.task_id)
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;
    let project = store
        .find_project(&task.project_id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;

    if project.team_lead != current_user
        && !is_project_member(store, &project.id, &current_user).await?
    {
        return Err(ApiError::Forbidden("You are not a member of this project"));
    }

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        content: payload.content,
        user_id: current_user.clone(),
        task_id: task.id,
        created_at: Utc::now(),
    };
    store.create_comment(&comment).await?;
    info!("Comment {} added to task {}", comment.id, comment.task_id);

    let user = store.find_user(&current_user).await?;
    Ok(HttpResponse::Ok().json(json!({ "comment": CommentWithUser { comment, user } })))
}

async fn task_comments(data: &AppState, task_id: &str) -> Result<HttpResponse, ApiError> {
    let store = data.store.as_ref();
    let mut comments = Vec::new();
    for comment in store.comments_for_task(task_id).await? {
        let user = store.find_user(&comment.user_id).await?;
        comments.push(CommentWithUser { comment, user });
    }
    Ok(HttpResponse::Ok().json(json!({ "comments": comments })))
}

/// GET /api/comments/{task_id}
pub async fn get_task_comments(
    req: HttpRequest,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    current_user(&req)?;
    task_comments(&data, &task_id).await
}

/// GET /api/comments?taskId=...
pub async fn list_comments(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<CommentQuery>,
) -> Result<HttpResponse, ApiError> {
    current_user(&req)?;
    task_comments(&data, &query.task_id).await
}

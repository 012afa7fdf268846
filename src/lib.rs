// src/lib.rs

pub mod app_state;
pub mod auth;
pub mod comment;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod mailer;
pub mod models;
pub mod project;
pub mod store;
pub mod task;
pub mod webhook;
pub mod workspace;

use actix_web::{web, HttpResponse};

use crate::comment::{add_comment, get_task_comments, list_comments};
use crate::project::{add_project_member, create_project, update_project};
use crate::task::{create_task, delete_tasks, update_task, update_task_status};
use crate::webhook::clerk_webhook;
use crate::workspace::{add_member, get_user_workspaces};

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("Server is Live")
}

/// Registers every route of the API.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health)).service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(|err, _| {
                error::ApiError::BadRequest(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _| {
                error::ApiError::BadRequest(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _| {
                error::ApiError::BadRequest(err.to_string()).into()
            }))
            // WEBHOOKS
            .route("/webhooks/clerk", web::post().to(clerk_webhook))
            // WORKSPACES
            .service(
                web::scope("/workspaces")
                    .route("", web::get().to(get_user_workspaces))
                    .route("/add-member", web::post().to(add_member)),
            )
            // PROJECTS
            .service(
                web::scope("/projects")
                    .route("", web::post().to(create_project))
                    .route("", web::put().to(update_project))
                    .route("/{project_id}/addMember", web::post().to(add_project_member)),
            )
            // TASKS
            .service(
                web::scope("/tasks")
                    .route("", web::post().to(create_task))
                    .route("/delete", web::post().to(delete_tasks))
                    .route("/{id}", web::put().to(update_task))
                    .route("/{id}/status", web::put().to(update_task_status)),
            )
            // COMMENTS
            .service(
                web::scope("/comments")
                    .route("", web::post().to(add_comment))
                    .route("", web::get().to(list_comments))
                    .route("/{task_id}", web::get().to(get_task_comments)),
            ),
    );
}

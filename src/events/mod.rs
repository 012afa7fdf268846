//! In-process event bus and the workflow functions it drives.
//!
//! Identity provider webhooks and API handlers publish [`Event`]s to the
//! [`EventBus`] actor. Each event maps to exactly one workflow function, which
//! runs detached on the actix runtime as a sequence of retried steps (see
//! [`step`]). The task assignment workflow persists its due-date wake-up as a
//! [`Reminder`](crate::models::Reminder); sending [`ResumeReminders`] after a
//! restart picks those up again.

pub mod step;
pub mod sync;
pub mod task_assigned;

use std::sync::Arc;

use actix::prelude::*;
use log::{error, info};
use serde::Deserialize;
use thiserror::Error;

use crate::mailer::{MailError, Mailer};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    pub id: Option<String>,
    pub email_address: String,
}

/// User payload of the identity provider's user events.
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    pub primary_email_address_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

impl UserData {
    /// The primary address, falling back to the first one listed.
    pub fn primary_email(&self) -> Option<&str> {
        let primary = self.primary_email_address_id.as_deref();
        self.email_addresses
            .iter()
            .find(|e| primary.is_some() && e.id.as_deref() == primary)
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }

    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedObject {
    pub id: String,
}

/// Organization payload of the identity provider's organization events.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationData {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub image_url: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublicUserData {
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipData {
    pub organization: OrganizationRef,
    pub public_user_data: PublicUserData,
    pub role: String,
}

#[derive(Debug, Clone)]
pub enum Event {
    UserCreated(UserData),
    UserUpdated(UserData),
    UserDeleted(DeletedObject),
    WorkspaceCreated(OrganizationData),
    WorkspaceUpdated(OrganizationData),
    WorkspaceDeleted(DeletedObject),
    WorkspaceMemberCreated(MembershipData),
    TaskAssigned { task_id: String, origin: String },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserCreated(_) => "clerk/user.created",
            Event::UserUpdated(_) => "clerk/user.updated",
            Event::UserDeleted(_) => "clerk/user.deleted",
            Event::WorkspaceCreated(_) => "clerk/organization.created",
            Event::WorkspaceUpdated(_) => "clerk/organization.updated",
            Event::WorkspaceDeleted(_) => "clerk/organization.deleted",
            Event::WorkspaceMemberCreated(_) => "clerk/organizationMembership.created",
            Event::TaskAssigned { .. } => "app/task.assigned",
        }
    }

    /// Id of the workflow function handling this event.
    pub fn function_id(&self) -> &'static str {
        match self {
            Event::UserCreated(_) => "sync-user-from-clerk",
            Event::UserUpdated(_) => "update-user-from-clerk",
            Event::UserDeleted(_) => "delete-user-from-clerk",
            Event::WorkspaceCreated(_) => "sync-workspace-from-clerk",
            Event::WorkspaceUpdated(_) => "update-workspace-from-clerk",
            Event::WorkspaceDeleted(_) => "delete-workspace-with-clerk",
            Event::WorkspaceMemberCreated(_) => "sync-workspace-member-from-clerk",
            Event::TaskAssigned { .. } => "send-task-assignment-mail",
        }
    }
}

/// Everything a workflow function may touch.
#[derive(Clone)]
pub struct WorkflowContext {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
}

/// Runs the workflow function of `event` to completion.
pub async fn dispatch(ctx: &WorkflowContext, event: Event) -> Result<(), WorkflowError> {
    match event {
        Event::UserCreated(data) => sync::create_user(ctx, &data).await,
        Event::UserUpdated(data) => sync::update_user(ctx, &data).await,
        Event::UserDeleted(data) => sync::delete_user(ctx, &data.id).await,
        Event::WorkspaceCreated(data) => sync::create_workspace(ctx, &data).await,
        Event::WorkspaceUpdated(data) => sync::update_workspace(ctx, &data).await,
        Event::WorkspaceDeleted(data) => sync::delete_workspace(ctx, &data.id).await,
        Event::WorkspaceMemberCreated(data) => sync::add_workspace_member(ctx, &data).await,
        Event::TaskAssigned { task_id, origin } => {
            task_assigned::run(ctx, &task_id, &origin).await
        }
    }
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish(pub Event);

/// Restarts the reminder of every task assignment interrupted by a shutdown.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ResumeReminders;

pub struct EventBus {
    ctx: WorkflowContext,
}

impl EventBus {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        EventBus {
            ctx: WorkflowContext { store, mailer },
        }
    }
}

impl Actor for EventBus {
    type Context = Context<Self>;
}

impl Handler<Publish> for EventBus {
    type Result = ();

    fn handle(&mut self, msg: Publish, _: &mut Context<Self>) {
        let event = msg.0;
        let wf = self.ctx.clone();
        let (name, function) = (event.name(), event.function_id());
        info!("Event {} received, running {}", name, function);
        actix::spawn(async move {
            match dispatch(&wf, event).await {
                Ok(()) => info!("Function {} completed", function),
                Err(e) => error!("Function {} failed for {}: {}", function, name, e),
            }
        });
    }
}

impl Handler<ResumeReminders> for EventBus {
    type Result = ();

    fn handle(&mut self, _: ResumeReminders, _: &mut Context<Self>) {
        let wf = self.ctx.clone();
        actix::spawn(async move {
            let pending = match wf.store.pending_reminders().await {
                Ok(pending) => pending,
                Err(e) => {
                    error!("Could not load pending reminders: {}", e);
                    return;
                }
            };
            if !pending.is_empty() {
                info!("Resuming {} pending task reminders", pending.len());
            }
            for reminder in pending {
                let wf = wf.clone();
                actix::spawn(async move {
                    if let Err(e) = task_assigned::remind(&wf, &reminder).await {
                        error!("Reminder for task {} failed: {}", reminder.task_id, e);
                    }
                });
            }
        });
    }
}

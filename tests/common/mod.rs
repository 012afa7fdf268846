#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix::Actor;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App, Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use project_management::app_state::AppState;
use project_management::auth::{Authentication, Claims, TokenVerifier};
use project_management::config::Config;
use project_management::events::{EventBus, WorkflowContext};
use project_management::mailer::{Email, MailError, Mailer};
use project_management::models::{
    Priority, Project, ProjectMember, ProjectStatus, Task, TaskStatus, TaskType, User, Workspace,
    WorkspaceMember, WorkspaceRole,
};
use project_management::store::{MemoryStore, Store};

pub const JWT_SECRET: &str = "integration-secret";
pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

impl TestContext {
    /// Must run inside an actix system, since it starts the event bus.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let events = EventBus::new(store.clone(), mailer.clone()).start();
        let state = AppState {
            store: store.clone(),
            events,
            config: config(),
        };
        Self {
            store,
            mailer,
            state,
        }
    }

    pub fn workflow(&self) -> WorkflowContext {
        WorkflowContext {
            store: self.store.clone(),
            mailer: self.mailer.clone(),
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        App::new()
            .wrap(Authentication::new(Arc::new(TokenVerifier::hs256(JWT_SECRET))))
            .app_data(web::Data::new(self.state.clone()))
            .configure(project_management::configure)
    }

    /// Polls the recording mailer until `count` mails arrived or a second passed.
    pub async fn wait_for_mail(&self, count: usize) -> Vec<Email> {
        for _ in 0..50 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.mailer.sent()
    }
}

pub fn config() -> Config {
    let vars: HashMap<&str, &str> = [
        ("JWT_SECRET", JWT_SECRET),
        ("CLERK_WEBHOOK_SECRET", WEBHOOK_SECRET),
    ]
    .into_iter()
    .collect();
    Config::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap()
}

pub fn bearer(user_id: &str) -> (&'static str, String) {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    ("Authorization", format!("Bearer {}", token))
}

pub async fn seed_user(store: &MemoryStore, id: &str) -> User {
    let user = User {
        id: id.to_string(),
        name: format!("User {}", id),
        email: format!("{}@example.com", id),
        image: None,
        created_at: Utc::now(),
    };
    store.create_user(&user).await.unwrap();
    user
}

pub async fn seed_workspace(store: &MemoryStore, id: &str, members: &[(&str, WorkspaceRole)]) {
    store
        .create_workspace(&Workspace {
            id: id.to_string(),
            name: format!("Workspace {}", id),
            slug: id.to_string(),
            description: None,
            owner_id: members.first().map(|(u, _)| u.to_string()).unwrap_or_default(),
            image_url: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    for (user_id, role) in members {
        store
            .add_workspace_member(&WorkspaceMember {
                id: format!("{}-{}", id, user_id),
                user_id: user_id.to_string(),
                workspace_id: id.to_string(),
                role: *role,
                message: String::new(),
            })
            .await
            .unwrap();
    }
}

pub async fn seed_project(
    store: &MemoryStore,
    id: &str,
    workspace_id: &str,
    team_lead: &str,
    members: &[&str],
) -> Project {
    let project = Project {
        id: id.to_string(),
        name: format!("Project {}", id),
        description: None,
        priority: Priority::Medium,
        status: ProjectStatus::Active,
        start_date: None,
        end_date: None,
        team_lead: team_lead.to_string(),
        workspace_id: workspace_id.to_string(),
        progress: 0,
        created_at: Utc::now(),
    };
    store.create_project(&project).await.unwrap();
    for user_id in members {
        store
            .add_project_member(&ProjectMember {
                id: format!("{}-{}", id, user_id),
                user_id: user_id.to_string(),
                project_id: id.to_string(),
            })
            .await
            .unwrap();
    }
    project
}

pub async fn seed_task(
    store: &MemoryStore,
    id: &str,
    project_id: &str,
    assignee: Option<&str>,
    status: TaskStatus,
    due_date: Option<DateTime<Utc>>,
) -> Task {
    let task = Task {
        id: id.to_string(),
        project_id: project_id.to_string(),
        title: format!("Task {}", id),
        description: None,
        task_type: TaskType::Task,
        status,
        priority: Priority::Medium,
        assignee_id: assignee.map(str::to_string),
        due_date,
        created_at: Utc::now(),
    };
    store.create_task(&task).await.unwrap();
    task
}

/// A workspace `w1` with admin `lead`, member `dev` and outsider `guest`
/// (workspace member, not on the project), plus project `p1` led by `lead`
/// with `dev` as its only member.
pub async fn seed_team(store: &MemoryStore) {
    for id in ["lead", "dev", "guest"] {
        seed_user(store, id).await;
    }
    seed_workspace(
        store,
        "w1",
        &[
            ("lead", WorkspaceRole::Admin),
            ("dev", WorkspaceRole::Member),
            ("guest", WorkspaceRole::Member),
        ],
    )
    .await;
    seed_project(store, "p1", "w1", "lead", &["dev"]).await;
}

// src/store.rs

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Comment, Project, ProjectMember, Reminder, Task, User, Workspace, WorkspaceMember,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for every record the API and the workflow functions touch.
///
/// Update and delete operations report whether a record matched, so callers
/// can map a miss onto a 404.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: &User) -> StoreResult<()>;
    async fn update_user(&self, user: &User) -> StoreResult<bool>;
    async fn delete_user(&self, user_id: &str) -> StoreResult<bool>;
    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn create_workspace(&self, workspace: &Workspace) -> StoreResult<()>;
    async fn update_workspace(&self, workspace: &Workspace) -> StoreResult<bool>;
    async fn delete_workspace(&self, workspace_id: &str) -> StoreResult<bool>;
    async fn find_workspace(&self, workspace_id: &str) -> StoreResult<Option<Workspace>>;
    async fn workspaces_for_user(&self, user_id: &str) -> StoreResult<Vec<Workspace>>;

    async fn add_workspace_member(&self, member: &WorkspaceMember) -> StoreResult<()>;
    async fn find_workspace_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<WorkspaceMember>>;
    async fn workspace_members(&self, workspace_id: &str) -> StoreResult<Vec<WorkspaceMember>>;

    async fn create_project(&self, project: &Project) -> StoreResult<()>;
    async fn find_project(&self, project_id: &str) -> StoreResult<Option<Project>>;
    async fn update_project(&self, project: &Project) -> StoreResult<bool>;
    async fn projects_in_workspace(&self, workspace_id: &str) -> StoreResult<Vec<Project>>;

    async fn add_project_member(&self, member: &ProjectMember) -> StoreResult<()>;
    async fn project_members(&self, project_id: &str) -> StoreResult<Vec<ProjectMember>>;

    async fn create_task(&self, task: &Task) -> StoreResult<()>;
    async fn find_task(&self, task_id: &str) -> StoreResult<Option<Task>>;
    async fn find_tasks(&self, task_ids: &[String]) -> StoreResult<Vec<Task>>;
    async fn update_task(&self, task: &Task) -> StoreResult<bool>;
    async fn delete_tasks(&self, task_ids: &[String]) -> StoreResult<u64>;
    async fn tasks_in_project(&self, project_id: &str) -> StoreResult<Vec<Task>>;

    async fn create_comment(&self, comment: &Comment) -> StoreResult<()>;
    /// Comments of a task, oldest first.
    async fn comments_for_task(&self, task_id: &str) -> StoreResult<Vec<Comment>>;

    /// Inserts or replaces the reminder of `reminder.task_id`.
    async fn save_reminder(&self, reminder: &Reminder) -> StoreResult<()>;
    async fn delete_reminder(&self, task_id: &str) -> StoreResult<()>;
    async fn pending_reminders(&self) -> StoreResult<Vec<Reminder>>;
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    workspaces: Vec<Workspace>,
    workspace_members: Vec<WorkspaceMember>,
    projects: Vec<Project>,
    project_members: Vec<ProjectMember>,
    tasks: Vec<Task>,
    comments: Vec<Comment>,
    reminders: Vec<Reminder>,
}

impl Tables {
    fn remove_tasks(&mut self, ids: &HashSet<String>) -> u64 {
        let before = self.tasks.len();
        self.tasks.retain(|t| !ids.contains(&t.id));
        self.comments.retain(|c| !ids.contains(&c.task_id));
        self.reminders.retain(|r| !ids.contains(&r.task_id));
        (before - self.tasks.len()) as u64
    }
}

/// Process-local store, used when no database is configured and by the tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn replace<T: Clone>(rows: &mut [T], value: &T, matches: impl Fn(&T) -> bool) -> bool {
    match rows.iter_mut().find(|row| matches(row)) {
        Some(row) => {
            *row = value.clone();
            true
        }
        None => false,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        self.lock()?.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        Ok(replace(&mut self.lock()?.users, user, |u| u.id == user.id))
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != user_id);
        tables.workspace_members.retain(|m| m.user_id != user_id);
        tables.project_members.retain(|m| m.user_id != user_id);
        Ok(tables.users.len() != before)
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_workspace(&self, workspace: &Workspace) -> StoreResult<()> {
        self.lock()?.workspaces.push(workspace.clone());
        Ok(())
    }

    async fn update_workspace(&self, workspace: &Workspace) -> StoreResult<bool> {
        Ok(replace(&mut self.lock()?.workspaces, workspace, |w| w.id == workspace.id))
    }

    async fn delete_workspace(&self, workspace_id: &str) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.workspaces.len();
        tables.workspaces.retain(|w| w.id != workspace_id);
        tables.workspace_members.retain(|m| m.workspace_id != workspace_id);

        let project_ids: HashSet<String> = tables
            .projects
            .iter()
            .filter(|p| p.workspace_id == workspace_id)
            .map(|p| p.id.clone())
            .collect();
        tables.projects.retain(|p| !project_ids.contains(&p.id));
        tables.project_members.retain(|m| !project_ids.contains(&m.project_id));
        let task_ids: HashSet<String> = tables
            .tasks
            .iter()
            .filter(|t| project_ids.contains(&t.project_id))
            .map(|t| t.id.clone())
            .collect();
        tables.remove_tasks(&task_ids);
        Ok(tables.workspaces.len() != before)
    }

    async fn find_workspace(&self, workspace_id: &str) -> StoreResult<Option<Workspace>> {
        Ok(self.lock()?.workspaces.iter().find(|w| w.id == workspace_id).cloned())
    }

    async fn workspaces_for_user(&self, user_id: &str) -> StoreResult<Vec<Workspace>> {
        let tables = self.lock()?;
        let ids: HashSet<&str> = tables
            .workspace_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.workspace_id.as_str())
            .collect();
        Ok(tables
            .workspaces
            .iter()
            .filter(|w| ids.contains(w.id.as_str()))
            .cloned()
            .collect())
    }

    async fn add_workspace_member(&self, member: &WorkspaceMember) -> StoreResult<()> {
        self.lock()?.workspace_members.push(member.clone());
        Ok(())
    }

    async fn find_workspace_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<WorkspaceMember>> {
        Ok(self
            .lock()?
            .workspace_members
            .iter()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned())
    }

    async fn workspace_members(&self, workspace_id: &str) -> StoreResult<Vec<WorkspaceMember>> {
        Ok(self
            .lock()?
            .workspace_members
            .iter()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn create_project(&self, project: &Project) -> StoreResult<()> {
        self.lock()?.projects.push(project.clone());
        Ok(())
    }

    async fn find_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        Ok(self.lock()?.projects.iter().find(|p| p.id == project_id).cloned())
    }

    async fn update_project(&self, project: &Project) -> StoreResult<bool> {
        Ok(replace(&mut self.lock()?.projects, project, |p| p.id == project.id))
    }

    async fn projects_in_workspace(&self, workspace_id: &str) -> StoreResult<Vec<Project>> {
        Ok(self
            .lock()?
            .projects
            .iter()
            .filter(|p| p.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn add_project_member(&self, member: &ProjectMember) -> StoreResult<()> {
        self.lock()?.project_members.push(member.clone());
        Ok(())
    }

    async fn project_members(&self, project_id: &str) -> StoreResult<Vec<ProjectMember>> {
        Ok(self
            .lock()?
            .project_members
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_task(&self, task: &Task) -> StoreResult<()> {
        self.lock()?.tasks.push(task.clone());
        Ok(())
    }

    async fn find_task(&self, task_id: &str) -> StoreResult<Option<Task>> {
        Ok(self.lock()?.tasks.iter().find(|t| t.id == task_id).cloned())
    }

    async fn find_tasks(&self, task_ids: &[String]) -> StoreResult<Vec<Task>> {
        Ok(self
            .lock()?
            .tasks
            .iter()
            .filter(|t| task_ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<bool> {
        Ok(replace(&mut self.lock()?.tasks, task, |t| t.id == task.id))
    }

    async fn delete_tasks(&self, task_ids: &[String]) -> StoreResult<u64> {
        let ids: HashSet<String> = task_ids.iter().cloned().collect();
        Ok(self.lock()?.remove_tasks(&ids))
    }

    async fn tasks_in_project(&self, project_id: &str) -> StoreResult<Vec<Task>> {
        Ok(self
            .lock()?
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.lock()?.comments.push(comment.clone());
        Ok(())
    }

    async fn comments_for_task(&self, task_id: &str) -> StoreResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .lock()?
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn save_reminder(&self, reminder: &Reminder) -> StoreResult<()> {
        let mut tables = self.lock()?;
        tables.reminders.retain(|r| r.task_id != reminder.task_id);
        tables.reminders.push(reminder.clone());
        Ok(())
    }

    async fn delete_reminder(&self, task_id: &str) -> StoreResult<()> {
        self.lock()?.reminders.retain(|r| r.task_id != task_id);
        Ok(())
    }

    async fn pending_reminders(&self) -> StoreResult<Vec<Reminder>> {
        Ok(self.lock()?.reminders.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, ProjectStatus, TaskStatus, TaskType, WorkspaceRole};
    use chrono::Utc;

    fn task(id: &str, project_id: &str) -> Task {
        Task {
            id: id.into(),
            project_id: project_id.into(),
            title: id.into(),
            description: None,
            task_type: TaskType::Task,
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            assignee_id: None,
            due_date: None,
            created_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn deleting_tasks_drops_their_comments_and_reminders() {
        let store = MemoryStore::new();
        for id in ["t1", "t2", "t3"] {
            store.create_task(&task(id, "p1")).await.unwrap();
        }
        store
            .create_comment(&Comment {
                id: "c1".into(),
                content: "hi".into(),
                user_id: "u1".into(),
                task_id: "t1".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .save_reminder(&Reminder {
                task_id: "t2".into(),
                origin: String::new(),
                remind_at: Utc::now(),
            })
            .await
            .unwrap();

        let removed = store
            .delete_tasks(&["t1".to_string(), "t2".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.tasks_in_project("p1").await.unwrap().len(), 1);
        assert!(store.comments_for_task("t1").await.unwrap().is_empty());
        assert!(store.pending_reminders().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn deleting_a_workspace_cascades() {
        let store = MemoryStore::new();
        store
            .create_workspace(&Workspace {
                id: "w1".into(),
                name: "Acme".into(),
                slug: "acme".into(),
                description: None,
                owner_id: "u1".into(),
                image_url: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .add_workspace_member(&WorkspaceMember {
                id: "m1".into(),
                user_id: "u1".into(),
                workspace_id: "w1".into(),
                role: WorkspaceRole::Admin,
                message: String::new(),
            })
            .await
            .unwrap();
        store
            .create_project(&Project {
                id: "p1".into(),
                name: "Apollo".into(),
                description: None,
                priority: Priority::Low,
                status: ProjectStatus::Planning,
                start_date: None,
                end_date: None,
                team_lead: "u1".into(),
                workspace_id: "w1".into(),
                progress: 0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store.create_task(&task("t1", "p1")).await.unwrap();

        assert!(store.delete_workspace("w1").await.unwrap());
        assert!(store.workspaces_for_user("u1").await.unwrap().is_empty());
        assert!(store.find_project("p1").await.unwrap().is_none());
        assert!(store.find_task("t1").await.unwrap().is_none());
        assert!(!store.delete_workspace("w1").await.unwrap());
    }

    #[actix_web::test]
    async fn saving_a_reminder_replaces_the_previous_one() {
        let store = MemoryStore::new();
        for origin in ["a", "b"] {
            store
                .save_reminder(&Reminder {
                    task_id: "t1".into(),
                    origin: origin.into(),
                    remind_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let pending = store.pending_reminders().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].origin, "b");
    }
}

// src/db.rs

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{options::ClientOptions, Client, Collection, Database};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{
    Comment, Project, ProjectMember, Reminder, Task, User, Workspace, WorkspaceMember,
};
use crate::store::{Store, StoreResult};

pub struct MongoStore {
    pub client: Client,
    pub db: Database,
}

impl MongoStore {
    pub async fn init(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        Ok(MongoStore { client, db })
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn workspaces(&self) -> Collection<Workspace> {
        self.db.collection("workspaces")
    }

    fn workspace_members(&self) -> Collection<WorkspaceMember> {
        self.db.collection("workspace_members")
    }

    fn projects(&self) -> Collection<Project> {
        self.db.collection("projects")
    }

    fn project_members(&self) -> Collection<ProjectMember> {
        self.db.collection("project_members")
    }

    fn tasks(&self) -> Collection<Task> {
        self.db.collection("tasks")
    }

    fn comments(&self) -> Collection<Comment> {
        self.db.collection("comments")
    }

    fn reminders(&self) -> Collection<Reminder> {
        self.db.collection("reminders")
    }

    async fn delete_task_ids(&self, ids: Vec<String>) -> StoreResult<u64> {
        let deleted = self
            .tasks()
            .delete_many(doc! { "id": { "$in": ids.clone() } })
            .await?
            .deleted_count;
        self.comments()
            .delete_many(doc! { "taskId": { "$in": ids.clone() } })
            .await?;
        self.reminders()
            .delete_many(doc! { "taskId": { "$in": ids } })
            .await?;
        Ok(deleted)
    }
}

async fn find_all<T>(coll: Collection<T>, filter: Document) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    let cursor = coll.find(filter).await?;
    Ok(cursor.try_collect().await?)
}

async fn replace_by_id<T>(coll: Collection<T>, id: &str, value: &T) -> StoreResult<bool>
where
    T: Serialize + Send + Sync,
{
    let res = coll.replace_one(doc! { "id": id }, value).await?;
    Ok(res.matched_count == 1)
}

#[async_trait]
impl Store for MongoStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        self.users().insert_one(user).await?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        replace_by_id(self.users(), &user.id, user).await
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let res = self.users().delete_one(doc! { "id": user_id }).await?;
        self.workspace_members()
            .delete_many(doc! { "userId": user_id })
            .await?;
        self.project_members()
            .delete_many(doc! { "userId": user_id })
            .await?;
        Ok(res.deleted_count == 1)
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "id": user_id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn create_workspace(&self, workspace: &Workspace) -> StoreResult<()> {
        self.workspaces().insert_one(workspace).await?;
        Ok(())
    }

    async fn update_workspace(&self, workspace: &Workspace) -> StoreResult<bool> {
        replace_by_id(self.workspaces(), &workspace.id, workspace).await
    }

    async fn delete_workspace(&self, workspace_id: &str) -> StoreResult<bool> {
        let res = self
            .workspaces()
            .delete_one(doc! { "id": workspace_id })
            .await?;
        self.workspace_members()
            .delete_many(doc! { "workspaceId": workspace_id })
            .await?;

        let project_ids: Vec<String> = self
            .projects_in_workspace(workspace_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        if !project_ids.is_empty() {
            let task_ids: Vec<String> = find_all(
                self.tasks(),
                doc! { "projectId": { "$in": project_ids.clone() } },
            )
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
            self.delete_task_ids(task_ids).await?;
            self.project_members()
                .delete_many(doc! { "projectId": { "$in": project_ids.clone() } })
                .await?;
            self.projects()
                .delete_many(doc! { "id": { "$in": project_ids } })
                .await?;
        }
        Ok(res.deleted_count == 1)
    }

    async fn find_workspace(&self, workspace_id: &str) -> StoreResult<Option<Workspace>> {
        Ok(self.workspaces().find_one(doc! { "id": workspace_id }).await?)
    }

    async fn workspaces_for_user(&self, user_id: &str) -> StoreResult<Vec<Workspace>> {
        let ids: Vec<String> = find_all(self.workspace_members(), doc! { "userId": user_id })
            .await?
            .into_iter()
            .map(|m| m.workspace_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        find_all(self.workspaces(), doc! { "id": { "$in": ids } }).await
    }

    async fn add_workspace_member(&self, member: &WorkspaceMember) -> StoreResult<()> {
        self.workspace_members().insert_one(member).await?;
        Ok(())
    }

    async fn find_workspace_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<WorkspaceMember>> {
        Ok(self
            .workspace_members()
            .find_one(doc! { "workspaceId": workspace_id, "userId": user_id })
            .await?)
    }

    async fn workspace_members(&self, workspace_id: &str) -> StoreResult<Vec<WorkspaceMember>> {
        find_all(self.workspace_members(), doc! { "workspaceId": workspace_id }).await
    }

    async fn create_project(&self, project: &Project) -> StoreResult<()> {
        self.projects().insert_one(project).await?;
        Ok(())
    }

    async fn find_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        Ok(self.projects().find_one(doc! { "id": project_id }).await?)
    }

    async fn update_project(&self, project: &Project) -> StoreResult<bool> {
        replace_by_id(self.projects(), &project.id, project).await
    }

    async fn projects_in_workspace(&self, workspace_id: &str) -> StoreResult<Vec<Project>> {
        find_all(self.projects(), doc! { "workspaceId": workspace_id }).await
    }

    async fn add_project_member(&self, member: &ProjectMember) -> StoreResult<()> {
        self.project_members().insert_one(member).await?;
        Ok(())
    }

    async fn project_members(&self, project_id: &str) -> StoreResult<Vec<ProjectMember>> {
        find_all(self.project_members(), doc! { "projectId": project_id }).await
    }

    async fn create_task(&self, task: &Task) -> StoreResult<()> {
        self.tasks().insert_one(task).await?;
        Ok(())
    }

    async fn find_task(&self, task_id: &str) -> StoreResult<Option<Task>> {
        Ok(self.tasks().find_one(doc! { "id": task_id }).await?)
    }

    async fn find_tasks(&self, task_ids: &[String]) -> StoreResult<Vec<Task>> {
        find_all(self.tasks(), doc! { "id": { "$in": task_ids.to_vec() } }).await
    }

    async fn update_task(&self, task: &Task) -> StoreResult<bool> {
        replace_by_id(self.tasks(), &task.id, task).await
    }

    async fn delete_tasks(&self, task_ids: &[String]) -> StoreResult<u64> {
        self.delete_task_ids(task_ids.to_vec()).await
    }

    async fn tasks_in_project(&self, project_id: &str) -> StoreResult<Vec<Task>> {
        find_all(self.tasks(), doc! { "projectId": project_id }).await
    }

    async fn create_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.comments().insert_one(comment).await?;
        Ok(())
    }

    async fn comments_for_task(&self, task_id: &str) -> StoreResult<Vec<Comment>> {
        let mut comments = find_all(self.comments(), doc! { "taskId": task_id }).await?;
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn save_reminder(&self, reminder: &Reminder) -> StoreResult<()> {
        self.reminders()
            .replace_one(doc! { "taskId": &reminder.task_id }, reminder)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn delete_reminder(&self, task_id: &str) -> StoreResult<()> {
        self.reminders().delete_one(doc! { "taskId": task_id }).await?;
        Ok(())
    }

    async fn pending_reminders(&self) -> StoreResult<Vec<Reminder>> {
        find_all(self.reminders(), doc! {}).await
    }
}

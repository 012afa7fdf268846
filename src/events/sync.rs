// Identity provider sync: users, workspaces and workspace memberships.

use std::sync::LazyLock;

use chrono::Utc;
use log::{info, warn};
use regex::Regex;
use uuid::Uuid;

use super::{step, MembershipData, OrganizationData, UserData, WorkflowContext, WorkflowError};
use crate::mailer;
use crate::models::{User, Workspace, WorkspaceMember, WorkspaceRole};

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

pub fn slugify(name: &str) -> String {
    NON_SLUG
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

fn user_from(data: &UserData, existing: Option<&User>) -> User {
    User {
        id: data.id.clone(),
        name: data.full_name(),
        email: data.primary_email().unwrap_or_default().to_string(),
        image: data.image_url.clone(),
        created_at: existing.map(|u| u.created_at).unwrap_or_else(Utc::now),
    }
}

/// `sync-user-from-clerk`: stores the user and sends a welcome email.
pub async fn create_user(ctx: &WorkflowContext, data: &UserData) -> Result<(), WorkflowError> {
    let user = step::run("create-user", move || async move {
        // Redelivered events must not duplicate the user.
        let existing = ctx.store.find_user(&data.id).await?;
        let user = user_from(data, existing.as_ref());
        if existing.is_some() {
            ctx.store.update_user(&user).await?;
        } else {
            ctx.store.create_user(&user).await?;
        }
        Ok::<_, WorkflowError>(user)
    })
    .await?;
    info!("User {} synced", user.id);

    if user.email.is_empty() {
        return Ok(());
    }
    let email = mailer::welcome(&user);
    step::run("send-welcome-email", move || ctx.mailer.send(email.clone())).await?;
    Ok(())
}

/// `update-user-from-clerk`
pub async fn update_user(ctx: &WorkflowContext, data: &UserData) -> Result<(), WorkflowError> {
    step::run("update-user", move || async move {
        let existing = ctx.store.find_user(&data.id).await?;
        let user = user_from(data, existing.as_ref());
        if existing.is_none() {
            warn!("User {} updated before it was synced; creating it", data.id);
            ctx.store.create_user(&user).await?;
        } else {
            ctx.store.update_user(&user).await?;
        }
        Ok::<_, WorkflowError>(())
    })
    .await
}

/// `delete-user-from-clerk`
pub async fn delete_user(ctx: &WorkflowContext, user_id: &str) -> Result<(), WorkflowError> {
    let deleted = step::run("delete-user", move || ctx.store.delete_user(user_id)).await?;
    if !deleted {
        info!("User {} was already gone", user_id);
    }
    Ok(())
}

/// `sync-workspace-from-clerk`: stores the workspace and makes its creator an ADMIN.
pub async fn create_workspace(
    ctx: &WorkflowContext,
    data: &OrganizationData,
) -> Result<(), WorkflowError> {
    step::run("create-workspace", move || async move {
        if ctx.store.find_workspace(&data.id).await?.is_some() {
            return Ok::<_, WorkflowError>(());
        }
        let workspace = Workspace {
            id: data.id.clone(),
            name: data.name.clone(),
            slug: data.slug.clone().unwrap_or_else(|| slugify(&data.name)),
            description: None,
            owner_id: data.created_by.clone().unwrap_or_default(),
            image_url: data.image_url.clone(),
            created_at: Utc::now(),
        };
        ctx.store.create_workspace(&workspace).await?;
        Ok(())
    })
    .await?;

    if let Some(creator) = &data.created_by {
        let creator = creator.as_str();
        step::run("add-creator-as-admin", move || {
            ensure_member(ctx, &data.id, creator, WorkspaceRole::Admin)
        })
        .await?;
    }
    info!("Workspace {} synced", data.id);
    Ok(())
}

/// `update-workspace-from-clerk`
pub async fn update_workspace(
    ctx: &WorkflowContext,
    data: &OrganizationData,
) -> Result<(), WorkflowError> {
    step::run("update-workspace", move || async move {
        let Some(mut workspace) = ctx.store.find_workspace(&data.id).await? else {
            warn!("Workspace {} updated before it was synced", data.id);
            return Ok::<_, WorkflowError>(());
        };
        workspace.name = data.name.clone();
        if let Some(slug) = &data.slug {
            workspace.slug = slug.clone();
        }
        workspace.image_url = data.image_url.clone();
        ctx.store.update_workspace(&workspace).await?;
        Ok(())
    })
    .await
}

/// `delete-workspace-with-clerk`
pub async fn delete_workspace(
    ctx: &WorkflowContext,
    workspace_id: &str,
) -> Result<(), WorkflowError> {
    step::run("delete-workspace", move || ctx.store.delete_workspace(workspace_id)).await?;
    Ok(())
}

/// `sync-workspace-member-from-clerk`
pub async fn add_workspace_member(
    ctx: &WorkflowContext,
    data: &MembershipData,
) -> Result<(), WorkflowError> {
    let role = WorkspaceRole::from_org_role(&data.role);
    let (workspace_id, user_id) = (
        data.organization.id.as_str(),
        data.public_user_data.user_id.as_str(),
    );
    step::run("create-workspace-member", move || {
        ensure_member(ctx, workspace_id, user_id, role)
    })
    .await
}

async fn ensure_member(
    ctx: &WorkflowContext,
    workspace_id: &str,
    user_id: &str,
    role: WorkspaceRole,
) -> Result<(), WorkflowError> {
    if ctx
        .store
        .find_workspace_member(workspace_id, user_id)
        .await?
        .is_some()
    {
        return Ok(());
    }
    ctx.store
        .add_workspace_member(&WorkspaceMember {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            workspace_id: workspace_id.to_string(),
            role,
            message: String::new(),
        })
        .await?;
    Ok(())
}

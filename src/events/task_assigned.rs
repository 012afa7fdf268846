// `send-task-assignment-mail`: notify the assignee now, remind them on the due date.

use chrono::{DateTime, Utc};
use log::info;

use super::{step, WorkflowContext, WorkflowError};
use crate::mailer;
use crate::models::{Project, Reminder, Task, TaskStatus, User};
use crate::store::StoreError;

struct LoadedTask {
    task: Task,
    project: Project,
    assignee: Option<User>,
}

async fn load(ctx: &WorkflowContext, task_id: &str) -> Result<Option<LoadedTask>, StoreError> {
    let Some(task) = ctx.store.find_task(task_id).await? else {
        return Ok(None);
    };
    let Some(project) = ctx.store.find_project(&task.project_id).await? else {
        return Ok(None);
    };
    let assignee = match &task.assignee_id {
        Some(user_id) => ctx.store.find_user(user_id).await?,
        None => None,
    };
    Ok(Some(LoadedTask {
        task,
        project,
        assignee,
    }))
}

/// Sends the assignment email, then (for tasks due on another day than today)
/// waits for the due date and sends a reminder unless the task is done.
pub async fn run(ctx: &WorkflowContext, task_id: &str, origin: &str) -> Result<(), WorkflowError> {
    let Some(loaded) = step::run("get-task", move || load(ctx, task_id)).await? else {
        info!("Task {} is gone, nothing to notify", task_id);
        return Ok(());
    };
    let Some(assignee) = &loaded.assignee else {
        info!("Task {} has no assignee", task_id);
        return Ok(());
    };

    let email = mailer::task_assigned(assignee, &loaded.task, &loaded.project, origin);
    step::run("send-email", move || ctx.mailer.send(email.clone())).await?;
    info!("Assignment mail for task {} sent to {}", task_id, assignee.id);

    let Some(due) = loaded.task.due_date.filter(|due| needs_reminder(*due, Utc::now())) else {
        return Ok(());
    };

    let reminder = Reminder {
        task_id: task_id.to_string(),
        origin: origin.to_string(),
        remind_at: due,
    };
    let pending = &reminder;
    step::run("schedule-reminder", move || ctx.store.save_reminder(pending)).await?;
    remind(ctx, &reminder).await
}

/// Tasks due on the day they are assigned get no separate reminder.
pub fn needs_reminder(due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    due.date_naive() != now.date_naive()
}

/// The sleeping half of the workflow. Also entered directly when a persisted
/// reminder is resumed at startup.
pub async fn remind(ctx: &WorkflowContext, reminder: &Reminder) -> Result<(), WorkflowError> {
    step::sleep_until("wait-for-the-due-date", reminder.remind_at).await;

    let task_id = reminder.task_id.as_str();
    let loaded = step::run("check-if-task-is-completed", move || load(ctx, task_id)).await?;
    match loaded {
        Some(LoadedTask {
            task,
            project,
            assignee: Some(assignee),
        }) if task.status != TaskStatus::Done => {
            let email = mailer::task_reminder(&assignee, &task, &project, &reminder.origin);
            step::run("send-reminder-email", move || ctx.mailer.send(email.clone())).await?;
            info!("Reminder for task {} sent to {}", task_id, assignee.id);
        }
        _ => info!("Task {} needs no reminder", task_id),
    }

    step::run("clear-reminder", move || ctx.store.delete_reminder(task_id)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reminds_only_for_other_days() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 23, 59, 0).unwrap();
        let later_today = Utc.with_ymd_and_hms(2026, 3, 10, 0, 1, 0).unwrap();
        let tomorrow = Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap();
        let last_week = Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0).unwrap();
        assert!(!needs_reminder(later_today, now));
        assert!(needs_reminder(tomorrow, now));
        assert!(needs_reminder(last_week, now));
    }
}

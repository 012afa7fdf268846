mod common;

use chrono::{Duration, Utc};

use common::{seed_task, seed_team, TestContext};
use project_management::events::task_assigned;
use project_management::models::{Reminder, TaskStatus};
use project_management::store::Store;

#[actix_web::test]
async fn open_task_gets_assignment_and_reminder() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    let due = Utc::now() - Duration::days(1);
    seed_task(&ctx.store, "t1", "p1", Some("dev"), TaskStatus::InProgress, Some(due)).await;

    task_assigned::run(&ctx.workflow(), "t1", "https://pm.example.com")
        .await
        .unwrap();

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].subject, "New Task Assignment in Project p1");
    assert_eq!(sent[1].subject, "Reminder for Project p1");
    assert!(sent.iter().all(|m| m.to == "dev@example.com"));
    assert!(ctx.store.pending_reminders().await.unwrap().is_empty());
}

#[actix_web::test]
async fn completed_task_gets_no_reminder() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    let due = Utc::now() - Duration::days(1);
    seed_task(&ctx.store, "t1", "p1", Some("dev"), TaskStatus::Done, Some(due)).await;

    task_assigned::run(&ctx.workflow(), "t1", "").await.unwrap();

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New Task Assignment in Project p1");
}

#[actix_web::test]
async fn tasks_without_due_date_or_due_today_get_one_mail() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    seed_task(&ctx.store, "t1", "p1", Some("dev"), TaskStatus::Todo, None).await;
    let noon_today = Utc::now()
        .date_naive()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc();
    seed_task(&ctx.store, "t2", "p1", Some("dev"), TaskStatus::Todo, Some(noon_today)).await;

    task_assigned::run(&ctx.workflow(), "t1", "").await.unwrap();
    task_assigned::run(&ctx.workflow(), "t2", "").await.unwrap();

    assert_eq!(ctx.mailer.sent().len(), 2);
    assert!(ctx.store.pending_reminders().await.unwrap().is_empty());
}

#[actix_web::test]
async fn unassigned_or_missing_tasks_send_nothing() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    seed_task(&ctx.store, "t1", "p1", None, TaskStatus::Todo, None).await;

    task_assigned::run(&ctx.workflow(), "t1", "").await.unwrap();
    task_assigned::run(&ctx.workflow(), "ghost", "").await.unwrap();

    assert!(ctx.mailer.sent().is_empty());
}

#[actix_web::test]
async fn future_due_date_is_persisted_while_waiting() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    let due = Utc::now() + Duration::days(3);
    seed_task(&ctx.store, "t1", "p1", Some("dev"), TaskStatus::Todo, Some(due)).await;

    let workflow = ctx.workflow();
    let handle = actix_web::rt::spawn(async move {
        let _ = task_assigned::run(&workflow, "t1", "https://pm.example.com").await;
    });

    let sent = ctx.wait_for_mail(1).await;
    assert_eq!(sent.len(), 1);
    let mut pending = Vec::new();
    for _ in 0..50 {
        pending = ctx.store.pending_reminders().await.unwrap();
        if !pending.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(
        pending,
        vec![Reminder {
            task_id: "t1".into(),
            origin: "https://pm.example.com".into(),
            remind_at: due,
        }]
    );
    handle.abort();
}

#[actix_web::test]
async fn resumed_reminder_checks_status_at_wake_up() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    seed_task(&ctx.store, "t1", "p1", Some("dev"), TaskStatus::Todo, None).await;
    let reminder = Reminder {
        task_id: "t1".into(),
        origin: String::new(),
        remind_at: Utc::now() - Duration::minutes(5),
    };
    ctx.store.save_reminder(&reminder).await.unwrap();

    task_assigned::remind(&ctx.workflow(), &reminder).await.unwrap();

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Reminder for Project p1");
    assert!(ctx.store.pending_reminders().await.unwrap().is_empty());
}

#[actix_web::test]
async fn event_bus_resumes_persisted_reminders() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    seed_task(&ctx.store, "t1", "p1", Some("dev"), TaskStatus::Todo, None).await;
    ctx.store
        .save_reminder(&Reminder {
            task_id: "t1".into(),
            origin: String::new(),
            remind_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();

    ctx.state
        .events
        .send(project_management::events::ResumeReminders)
        .await
        .unwrap();

    let sent = ctx.wait_for_mail(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Reminder for Project p1");
}

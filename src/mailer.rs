// src/mailer.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::models::{Project, Task, User};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    /// HTML body.
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Sends HTML mail through an authenticated STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, user: String, pass: String) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(user, pass))
            .build();
        Ok(Self {
            transport,
            sender: config.sender.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(email.to.parse()?)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.body)?;
        let response = self.transport.send(message).await?;
        info!("Mail accepted by relay: {:?}", response.code());
        Ok(())
    }
}

/// Logs mail instead of sending it. Used when no SMTP credentials are configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!("Mail to {} [{}] not sent (no SMTP credentials)", email.to, email.subject);
        Ok(())
    }
}

pub fn from_config(config: &SmtpConfig) -> Result<Box<dyn Mailer>, MailError> {
    match (&config.user, &config.pass) {
        (Some(user), Some(pass)) => Ok(Box::new(SmtpMailer::new(
            config,
            user.clone(),
            pass.clone(),
        )?)),
        _ => Ok(Box::new(LogMailer)),
    }
}

fn format_day(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "No due date".to_string())
}

/// Escapes text for HTML element content and quoted attribute values.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn welcome(user: &User) -> Email {
    Email {
        to: user.email.clone(),
        subject: "Welcome aboard".to_string(),
        body: format!(
            "<div style=\"font-family: Arial, sans-serif;\">\
             <h2>Hi {name},</h2>\
             <p>Your account is ready. Create a workspace or accept an invitation to start planning projects.</p>\
             </div>",
            name = escape(&user.name)
        ),
    }
}

pub fn task_assigned(assignee: &User, task: &Task, project: &Project, origin: &str) -> Email {
    Email {
        to: assignee.email.clone(),
        subject: format!("New Task Assignment in {}", project.name),
        body: format!(
            "<div style=\"font-family: Arial, sans-serif;\">\
             <h2>Hi {name},</h2>\
             <p>You've been assigned a new task:</p>\
             <p style=\"font-size: 18px; font-weight: bold; color: #007bff;\">{title}</p>\
             <p>{description}</p>\
             <p><strong>Due Date:</strong> {due}</p>\
             <a href=\"{origin}\" style=\"background-color: #007bff; color: #fff; padding: 10px 20px; border-radius: 5px; text-decoration: none;\">View Task</a>\
             </div>",
            name = escape(&assignee.name),
            title = escape(&task.title),
            description = escape(task.description.as_deref().unwrap_or("")),
            due = format_day(task.due_date),
            origin = escape(origin),
        ),
    }
}

pub fn task_reminder(assignee: &User, task: &Task, project: &Project, origin: &str) -> Email {
    Email {
        to: assignee.email.clone(),
        subject: format!("Reminder for {}", project.name),
        body: format!(
            "<div style=\"font-family: Arial, sans-serif;\">\
             <h2>Hi {name},</h2>\
             <p>You have a task due on {due} in {project}:</p>\
             <p style=\"font-size: 18px; font-weight: bold; color: #007bff;\">{title}</p>\
             <a href=\"{origin}\" style=\"background-color: #007bff; color: #fff; padding: 10px 20px; border-radius: 5px; text-decoration: none;\">View Task</a>\
             </div>",
            name = escape(&assignee.name),
            due = format_day(task.due_date),
            project = escape(&project.name),
            title = escape(&task.title),
            origin = escape(origin),
        ),
    }
}

pub mod task;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use task::{Task, TaskStatus, TaskType};

/// A user mirrored from the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity provider user id.
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A tenant grouping users and projects. Mirrors an identity provider organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Identity provider organization id.
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub owner_id: String,
    #[serde(rename = "image_url")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Roles for a user within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceRole {
    Admin,
    Member,
}

impl WorkspaceRole {
    /// Maps an identity provider organization role (`org:admin`, `org:member`).
    pub fn from_org_role(role: &str) -> Self {
        match role {
            "org:admin" | "admin" => WorkspaceRole::Admin,
            _ => WorkspaceRole::Member,
        }
    }
}

/// Join record mapping a user to a workspace, with a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: String,
    pub user_id: String,
    pub workspace_id: String,
    pub role: WorkspaceRole,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Active,
    Planning,
    Completed,
    OnHold,
    Cancelled,
}

/// A project inside a workspace. `team_lead` holds the user id of the lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: ProjectStatus,
    #[serde(rename = "start_date")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "end_date")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "team_lead")]
    pub team_lead: String,
    pub workspace_id: String,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
}

/// Join record mapping a user to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub task_id: String,
    pub created_at: DateTime<Utc>,
}

/// A pending due-date reminder of the task assignment workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub task_id: String,
    pub origin: String,
    #[serde(rename = "remind_at")]
    pub remind_at: DateTime<Utc>,
}

/// Serde helpers for client supplied dates, which arrive either as RFC 3339
/// timestamps or as bare `YYYY-MM-DD` days (taken as midnight UTC).
pub mod client_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse(value)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", value))),
        }
    }

    /// Like [`option`], but keeps an explicit `null` (or `""`) apart from an
    /// absent field. Use with `#[serde(default)]`.
    pub fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        option(deserializer).map(Some)
    }
}

/// Deserializes a present field into `Some`, so that with `#[serde(default)]`
/// an absent field is `None` and `null` is `Some(None)`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_day_and_timestamp_dates() {
        assert_eq!(
            client_date::parse("2025-03-04"),
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap())
        );
        assert_eq!(
            client_date::parse("2025-03-04T10:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 8, 30, 0).unwrap())
        );
        assert_eq!(client_date::parse("next tuesday"), None);
    }

    #[test]
    fn maps_org_roles() {
        assert_eq!(WorkspaceRole::from_org_role("org:admin"), WorkspaceRole::Admin);
        assert_eq!(WorkspaceRole::from_org_role("org:member"), WorkspaceRole::Member);
        assert_eq!(
            serde_json::to_value(WorkspaceRole::Admin).unwrap(),
            serde_json::json!("ADMIN")
        );
    }

    #[test]
    fn project_uses_snake_case_for_legacy_fields() {
        let project = Project {
            id: "p1".into(),
            name: "Apollo".into(),
            description: None,
            priority: Priority::High,
            status: ProjectStatus::OnHold,
            start_date: None,
            end_date: None,
            team_lead: "u1".into(),
            workspace_id: "w1".into(),
            progress: 10,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value["team_lead"], "u1");
        assert_eq!(value["workspaceId"], "w1");
        assert_eq!(value["status"], "ON_HOLD");
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which entry mutation produced the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Create,
    Edit,
    Delete,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Create => "create",
            NotificationKind::Edit => "edit",
            NotificationKind::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(NotificationKind::Create),
            "edit" => Some(NotificationKind::Edit),
            "delete" => Some(NotificationKind::Delete),
            _ => None,
        }
    }

    /// Message shown to the user for a mutation of the entry titled `title`.
    pub fn message_for(&self, title: &str) -> String {
        let verb = match self {
            NotificationKind::Create => "created",
            NotificationKind::Edit => "updated",
            NotificationKind::Delete => "deleted",
        };
        format!("Entry \"{}\" was {}", title, verb)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

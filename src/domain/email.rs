use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Success,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Success => "success",
            EmailStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(EmailStatus::Success),
            "failed" => Some(EmailStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: i64,
    pub to_email: String,
    pub subject: String,
    pub status: EmailStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailStats {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    pub success_rate: f64,
}

impl EmailStats {
    pub fn from_counts(successful: i64, failed: i64) -> Self {
        let total = successful + failed;
        let success_rate = if total > 0 {
            (successful as f64 / total as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        Self { total, successful, failed, success_rate }
    }
}

/// An address outside the student directory that is copied on announcement
/// emails when admins are included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecipient {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNotificationRecipient {
    #[validate(email)]
    pub email: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateNotificationRecipient {
    #[validate(email)]
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

fn default_active() -> bool {
    true
}

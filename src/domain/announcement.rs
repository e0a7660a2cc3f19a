use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::AudienceRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub category: String,
    pub audience: AudienceRule,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    pub category: Option<String>,
    #[serde(default)]
    pub audience: AudienceRule,
    #[serde(default = "default_true")]
    pub notify_students: bool,
    #[serde(default)]
    pub include_admins: bool,
}

/// Field-level overwrite. `audience`, when present, replaces the whole rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub audience: Option<AudienceRule>,
}

fn default_true() -> bool {
    true
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Stages of the apprenticeship pipeline as the program currently names them.
/// Stored as free text; this list seeds demo data and admin pickers.
pub const PROGRAM_STAGES: &[&str] = &[
    "Pre-Apprentice Explorer",
    "Pre-Apprentice Candidate",
    "Apprentice",
    "Completed Pre-Apprentice",
    "Completed Apprentice",
    "Not Active",
];

/// Regional C-CAP affiliations used as location tags.
pub const LOCATION_TAGS: &[&str] = &[
    "Arizona - C-CAP",
    "Chicago - C-CAP",
    "Los Angeles - C-CAP",
    "New York/New Jersey - C-CAP",
    "Philadelphia - C-CAP",
    "Washington DC - C-CAP",
    "Miami - C-CAP",
    "Houston - C-CAP",
    "Other",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub preferred_name: Option<String>,
    pub phone: Option<String>,
    pub contact_email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub program_stage: Option<String>,
    pub location_tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directory view of a student: the account joined with its profile.
/// Every profile-derived field is `None` for a student who never filled one in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: Uuid,
    pub email: Option<String>,
    pub contact_email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub program_stage: Option<String>,
    pub location_tag: Option<String>,
    pub state: Option<String>,
}

impl StudentRecord {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.email.clone().unwrap_or_else(|| self.id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpsertStudentProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub preferred_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location_tag: Option<String>,
}

/// Admin-side creation of a student account together with its profile.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(nested)]
    pub profile: UpsertStudentProfileRequest,
    pub program_stage: Option<String>,
}

/// Search terms shorter than this return no results.
pub const MIN_SEARCH_LEN: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkStageAssignment {
    pub student_ids: Vec<Uuid>,
    pub program_stage: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkStageResult {
    pub updated: Vec<Uuid>,
    pub not_found: Vec<Uuid>,
}

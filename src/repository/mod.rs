use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod user_repository;
pub mod student_repository;
pub mod announcement_repository;
pub mod email_log_repository;
pub mod notification_recipient_repository;

pub use user_repository::SqliteUserRepository;
pub use student_repository::SqliteStudentRepository;
pub use announcement_repository::SqliteAnnouncementRepository;
pub use email_log_repository::SqliteEmailLogRepository;
pub use notification_recipient_repository::SqliteNotificationRecipientRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>>;
    async fn password_hash(&self, email: &str) -> Result<Option<String>>;
    async fn username_exists(&self, username: &str) -> Result<bool>;
    /// Hashes and stores a new password. Returns false when no user has `id`.
    async fn set_password(&self, id: Uuid, password: &str) -> Result<bool>;
}

/// Read side of student data used for targeting, plus the profile writes
/// that feed it.
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn list_students(&self, filter: &DirectoryFilter) -> Result<Vec<StudentRecord>>;
    async fn find_student(&self, user_id: Uuid) -> Result<Option<StudentRecord>>;
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<StudentProfile>>;
    async fn upsert_profile(&self, user_id: Uuid, profile: UpsertStudentProfileRequest) -> Result<StudentProfile>;
    /// Returns false when the student has no profile to update.
    async fn set_program_stage(&self, user_id: Uuid, program_stage: &str) -> Result<bool>;
    /// Case-insensitive substring match on email, username and name.
    async fn search_students(&self, query: &str) -> Result<Vec<StudentRecord>>;
    /// Removes the student account; profile and sessions go with it.
    async fn delete_student(&self, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    async fn create(&self, announcement: Announcement) -> Result<Announcement>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Announcement>>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Announcement>>;
    async fn update(&self, id: Uuid, announcement: Announcement) -> Result<Announcement>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait EmailLogRepository: Send + Sync {
    async fn record(&self, entries: Vec<NewEmailLog>) -> Result<()>;
    async fn list(&self, limit: i64, offset: i64, status: Option<EmailStatus>) -> Result<Vec<EmailLog>>;
    async fn stats(&self) -> Result<EmailStats>;
}

#[async_trait]
pub trait NotificationRecipientRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<NotificationRecipient>>;
    async fn find_by_id(&self, id: i64) -> Result<Option<NotificationRecipient>>;
    async fn create(&self, recipient: CreateNotificationRecipient) -> Result<NotificationRecipient>;
    async fn update(&self, id: i64, update: UpdateNotificationRecipient) -> Result<Option<NotificationRecipient>>;
    async fn delete(&self, id: i64) -> Result<bool>;
    async fn toggle_active(&self, id: i64) -> Result<Option<NotificationRecipient>>;
    async fn active_emails(&self) -> Result<Vec<String>>;
}

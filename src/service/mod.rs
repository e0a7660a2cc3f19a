pub mod matcher;
pub mod announcement_service;
pub mod student_service;
pub mod admin_service;
pub mod notification_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::repository::*;
use crate::notify::Notifier;
use crate::auth::AuthService;
use announcement_service::AnnouncementService;
use student_service::StudentService;
use admin_service::AdminService;
use notification_service::NotificationService;

pub use announcement_service::{AudiencePreview, CreatedAnnouncement};

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub student_directory: Arc<dyn StudentDirectory>,
    pub announcement_repo: Arc<dyn AnnouncementRepository>,
    pub email_log_repo: Arc<dyn EmailLogRepository>,
    pub notification_recipient_repo: Arc<dyn NotificationRecipientRepository>,
    pub auth_service: Arc<AuthService>,
    pub announcement_service: Arc<AnnouncementService>,
    pub student_service: Arc<StudentService>,
    pub admin_service: Arc<AdminService>,
    pub notification_service: Arc<NotificationService>,
    pub notifier: Option<Arc<Notifier>>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        auth_service: Arc<AuthService>,
        notifier: Option<Arc<Notifier>>,
        db_pool: SqlitePool,
    ) -> Self {
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let student_directory: Arc<dyn StudentDirectory> = Arc::new(SqliteStudentRepository::new(db_pool.clone()));
        let announcement_repo: Arc<dyn AnnouncementRepository> = Arc::new(SqliteAnnouncementRepository::new(db_pool.clone()));
        let email_log_repo: Arc<dyn EmailLogRepository> = Arc::new(SqliteEmailLogRepository::new(db_pool.clone()));
        let notification_recipient_repo: Arc<dyn NotificationRecipientRepository> =
            Arc::new(SqliteNotificationRecipientRepository::new(db_pool.clone()));

        let announcement_service = Arc::new(AnnouncementService::new(
            announcement_repo.clone(),
            student_directory.clone(),
            user_repo.clone(),
            notification_recipient_repo.clone(),
            notifier.clone(),
        ));
        let student_service = Arc::new(StudentService::new(student_directory.clone(), user_repo.clone()));
        let admin_service = Arc::new(AdminService::new(user_repo.clone()));
        let notification_service = Arc::new(NotificationService::new(
            notification_recipient_repo.clone(),
            notifier.clone(),
        ));

        Self {
            user_repo,
            student_directory,
            announcement_repo,
            email_log_repo,
            notification_recipient_repo,
            auth_service,
            announcement_service,
            student_service,
            admin_service,
            notification_service,
            notifier,
            db_pool,
        }
    }
}

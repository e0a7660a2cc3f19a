#![allow(dead_code)]

use std::sync::Arc;

use apprentice_portal::{
    auth::AuthService,
    domain::{CreateUserRequest, UpsertStudentProfileRequest, User, UserRole},
    error::{AppError, Result},
    notify::{EmailTransport, Notifier},
    repository::{
        SqliteEmailLogRepository, SqliteStudentRepository, SqliteUserRepository,
        StudentDirectory, UserRepository,
    },
    service::ServiceContext,
};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tokio::sync::Mutex;
use uuid::Uuid;

/// One connection, so every query sees the same in-memory database.
pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Service graph over `pool`. With a transport, email goes through a
/// notifier with batch size 2 that logs to `email_logs`.
pub fn service_context(pool: &SqlitePool, transport: Option<Arc<CapturingTransport>>) -> ServiceContext {
    let notifier = transport.map(|t| {
        let transport: Arc<dyn EmailTransport> = t;
        Arc::new(
            Notifier::new(transport, 2)
                .with_log(Arc::new(SqliteEmailLogRepository::new(pool.clone()))),
        )
    });
    let auth = Arc::new(AuthService::new(pool.clone(), 24, false));
    ServiceContext::new(auth, notifier, pool.clone())
}

pub async fn create_user(pool: &SqlitePool, username: &str, role: UserRole) -> anyhow::Result<User> {
    let repo = SqliteUserRepository::new(pool.clone());
    let user = repo.create(CreateUserRequest {
        email: format!("{}@example.com", username),
        username: username.to_string(),
        password: "password123".to_string(),
        role,
    }).await?;
    Ok(user)
}

pub struct StudentSpec<'a> {
    pub username: &'a str,
    pub program_stage: Option<&'a str>,
    pub location_tag: Option<&'a str>,
    pub state: Option<&'a str>,
}

/// Creates a student account with a profile. Pass `None` for every
/// attribute to get a student who filled in nothing but their name.
pub async fn create_student(pool: &SqlitePool, spec: StudentSpec<'_>) -> anyhow::Result<User> {
    let user = create_user(pool, spec.username, UserRole::Student).await?;
    let directory = SqliteStudentRepository::new(pool.clone());

    directory.upsert_profile(user.id, UpsertStudentProfileRequest {
        first_name: spec.username.to_string(),
        last_name: "Student".to_string(),
        state: spec.state.map(str::to_string),
        location_tag: spec.location_tag.map(str::to_string),
        ..Default::default()
    }).await?;

    if let Some(stage) = spec.program_stage {
        directory.set_program_stage(user.id, stage).await?;
    }

    Ok(user)
}

pub fn ids(users: &[&User]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    ids.sort();
    ids
}

/// In-process transport that keeps every batch it was handed.
#[derive(Default)]
pub struct CapturingTransport {
    pub batches: Mutex<Vec<Vec<String>>>,
    pub fail_all: bool,
}

impl CapturingTransport {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail_all: true, ..Default::default() })
    }

    pub async fn recipients(&self) -> Vec<String> {
        let mut all: Vec<String> = self.batches.lock().await.iter().flatten().cloned().collect();
        all.sort();
        all
    }
}

#[async_trait]
impl EmailTransport for CapturingTransport {
    fn name(&self) -> &str {
        "capturing"
    }

    async fn send_batch(&self, recipients: &[String], _subject: &str, _html_body: &str) -> Result<()> {
        self.batches.lock().await.push(recipients.to_vec());
        if self.fail_all {
            return Err(AppError::External("mail provider unavailable".to_string()));
        }
        Ok(())
    }
}

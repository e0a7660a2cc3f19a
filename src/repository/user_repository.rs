use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    auth::AuthService,
    domain::{CreateUserRequest, User, UserRole},
    error::{AppError, Result},
    repository::UserRepository,
};

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    username: String,
    role: String,
    is_active: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: UserRow) -> Result<User> {
        Ok(User {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            email: row.email,
            username: row.username,
            role: UserRole::from_str(&row.role)
                .ok_or_else(|| AppError::Database(format!("Invalid user role: {}", row.role)))?,
            is_active: row.is_active != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let id = Uuid::new_v4();
        let password_hash = AuthService::hash_password(&request.password).await?;
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, username, password_hash, role, is_active,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&request.email)
        .bind(&request.username)
        .bind(&password_hash)
        .bind(request.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
                if db.message().contains("email") {
                    AppError::Conflict("Email already registered".to_string())
                } else {
                    AppError::Conflict("Username already taken".to_string())
                }
            }
            _ => AppError::Database(e.to_string()),
        })?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created user".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, role, is_active, created_at, updated_at
            FROM users
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, role, is_active, created_at, updated_at
            FROM users
            WHERE email = ?
            "#
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, role, is_active, created_at, updated_at
            FROM users
            WHERE role = ?
            ORDER BY created_at ASC
            "#
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_user)
            .collect()
    }

    async fn password_hash(&self, email: &str) -> Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM users WHERE email = ? AND is_active = 1"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hash)
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn set_password(&self, id: Uuid, password: &str) -> Result<bool> {
        let password_hash = AuthService::hash_password(password).await?;

        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};

use crate::{
    domain::{CreateNotificationRecipient, NotificationRecipient, UpdateNotificationRecipient},
    error::{AppError, Result},
    repository::NotificationRecipientRepository,
};

#[derive(FromRow)]
struct RecipientRow {
    id: i64,
    email: String,
    is_active: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<RecipientRow> for NotificationRecipient {
    fn from(row: RecipientRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            is_active: row.is_active != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, email, is_active, created_at, updated_at FROM email_notifications";

pub struct SqliteNotificationRecipientRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRecipientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRecipientRepository for SqliteNotificationRecipientRepository {
    async fn list(&self) -> Result<Vec<NotificationRecipient>> {
        let query = format!("{} ORDER BY id ASC", SELECT_COLUMNS);
        let rows = sqlx::query_as::<_, RecipientRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<NotificationRecipient>> {
        let query = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, RecipientRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn create(&self, recipient: CreateNotificationRecipient) -> Result<NotificationRecipient> {
        let now = Utc::now().naive_utc();

        let id = sqlx::query(
            "INSERT INTO email_notifications (email, is_active, created_at, updated_at) VALUES (?, ?, ?, ?)"
        )
        .bind(&recipient.email)
        .bind(recipient.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created notification recipient".to_string())
        })
    }

    async fn update(&self, id: i64, update: UpdateNotificationRecipient) -> Result<Option<NotificationRecipient>> {
        let result = sqlx::query(
            r#"
            UPDATE email_notifications
            SET email = COALESCE(?, email),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(&update.email)
        .bind(update.is_active)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM email_notifications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_active(&self, id: i64) -> Result<Option<NotificationRecipient>> {
        let result = sqlx::query(
            "UPDATE email_notifications SET is_active = 1 - is_active, updated_at = ? WHERE id = ?"
        )
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn active_emails(&self) -> Result<Vec<String>> {
        let emails = sqlx::query_scalar::<_, String>(
            "SELECT email FROM email_notifications WHERE is_active = 1 ORDER BY id ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(emails)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};

use crate::{
    domain::{EmailLog, EmailStats, EmailStatus, NewEmailLog},
    error::{AppError, Result},
    repository::EmailLogRepository,
};

#[derive(FromRow)]
struct EmailLogRow {
    id: i64,
    to_email: String,
    subject: String,
    status: String,
    error_message: Option<String>,
    sent_at: NaiveDateTime,
}

pub struct SqliteEmailLogRepository {
    pool: SqlitePool,
}

impl SqliteEmailLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_log(row: EmailLogRow) -> Result<EmailLog> {
        Ok(EmailLog {
            id: row.id,
            to_email: row.to_email,
            subject: row.subject,
            status: EmailStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid email status: {}", row.status)))?,
            error_message: row.error_message,
            sent_at: DateTime::from_naive_utc_and_offset(row.sent_at, Utc),
        })
    }
}

#[async_trait]
impl EmailLogRepository for SqliteEmailLogRepository {
    async fn record(&self, entries: Vec<NewEmailLog>) -> Result<()> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO email_logs (to_email, subject, body, status, error_message, sent_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#
            )
            .bind(&entry.to_email)
            .bind(&entry.subject)
            .bind(&entry.body)
            .bind(entry.status.as_str())
            .bind(&entry.error_message)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64, status: Option<EmailStatus>) -> Result<Vec<EmailLog>> {
        let rows = sqlx::query_as::<_, EmailLogRow>(
            r#"
            SELECT id, to_email, subject, status, error_message, sent_at
            FROM email_logs
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY sent_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_log)
            .collect()
    }

    async fn stats(&self) -> Result<EmailStats> {
        let (successful, failed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0)
            FROM email_logs
            "#
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(EmailStats::from_counts(successful, failed))
    }
}

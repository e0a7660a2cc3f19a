use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    expires_at: NaiveDateTime,
    created_at: NaiveDateTime,
}

pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at, last_used_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&id)
        .bind(user_id.to_string())
        .bind(hash_token(token))
        .bind(expires_at.naive_utc())
        .bind(now.naive_utc())
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(Session {
            id,
            user_id,
            expires_at,
            created_at: now,
            last_used_at: now,
        })
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<Session>> {
        let now = Utc::now();
        let now_naive = now.naive_utc();

        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, expires_at, created_at
            FROM sessions
            WHERE token_hash = ? AND expires_at > ?
            "#
        )
        .bind(hash_token(token))
        .bind(now_naive)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query("UPDATE sessions SET last_used_at = ? WHERE id = ?")
            .bind(now_naive)
            .bind(&row.id)
            .execute(&self.pool)
            .await?;

        Ok(Some(Session {
            id: row.id,
            user_id: Uuid::parse_str(&row.user_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            expires_at: DateTime::from_naive_utc_and_offset(row.expires_at, Utc),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            last_used_at: now,
        }))
    }

    pub async fn delete_by_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().naive_utc())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn hash_token(token: &str) -> String {
    use sha2::{Sha256, Digest};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing() {
        let hash1 = hash_token("test_token");
        let hash2 = hash_token("test_token");
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, "test_token");
        assert_eq!(hash1.len(), 64);
    }
}

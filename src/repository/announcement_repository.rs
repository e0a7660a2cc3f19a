use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::{Announcement, AudienceMode, AudienceRule, Priority},
    error::{AppError, Result},
    repository::AnnouncementRepository,
};

#[derive(FromRow)]
struct AnnouncementRow {
    id: String,
    title: String,
    content: String,
    priority: String,
    category: String,
    target_audience: String,
    target_bucket: Option<String>,
    target_state: Option<String>,
    target_program_stages: Option<String>,
    target_locations: Option<String>,
    created_by: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, title, content, priority, category,
           target_audience, target_bucket, target_state,
           target_program_stages, target_locations,
           created_by, created_at, updated_at
    FROM announcements
"#;

pub struct SqliteAnnouncementRepository {
    pool: SqlitePool,
}

impl SqliteAnnouncementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_announcement(row: AnnouncementRow) -> Result<Announcement> {
        let mode = AudienceMode::from_str(&row.target_audience)
            .ok_or_else(|| AppError::Database(format!("Invalid target audience: {}", row.target_audience)))?;

        Ok(Announcement {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            content: row.content,
            priority: Priority::from_str(&row.priority)
                .ok_or_else(|| AppError::Database(format!("Invalid priority: {}", row.priority)))?,
            category: row.category,
            audience: AudienceRule {
                mode,
                bucket: row.target_bucket,
                state: row.target_state,
                program_stages: Self::decode_tags(row.target_program_stages.as_deref())?,
                locations: Self::decode_tags(row.target_locations.as_deref())?,
            },
            created_by: row.created_by
                .as_deref()
                .map(Uuid::parse_str)
                .transpose()
                .map_err(|e| AppError::Database(e.to_string()))?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn decode_tags(raw: Option<&str>) -> Result<BTreeSet<String>> {
        match raw {
            None | Some("") => Ok(BTreeSet::new()),
            Some(json) => serde_json::from_str(json)
                .map_err(|e| AppError::Database(format!("Invalid tag list: {}", e))),
        }
    }

    fn encode_tags(tags: &BTreeSet<String>) -> Result<Option<String>> {
        if tags.is_empty() {
            return Ok(None);
        }
        serde_json::to_string(tags)
            .map(Some)
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[async_trait]
impl AnnouncementRepository for SqliteAnnouncementRepository {
    async fn create(&self, announcement: Announcement) -> Result<Announcement> {
        let audience = &announcement.audience;
        let program_stages = Self::encode_tags(&audience.program_stages)?;
        let locations = Self::encode_tags(&audience.locations)?;

        sqlx::query(
            r#"
            INSERT INTO announcements (
                id, title, content, priority, category,
                target_audience, target_bucket, target_state,
                target_program_stages, target_locations,
                created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(announcement.id.to_string())
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(announcement.priority.as_str())
        .bind(&announcement.category)
        .bind(audience.mode.as_str())
        .bind(&audience.bucket)
        .bind(&audience.state)
        .bind(program_stages)
        .bind(locations)
        .bind(announcement.created_by.map(|id| id.to_string()))
        .bind(announcement.created_at.naive_utc())
        .bind(announcement.updated_at.naive_utc())
        .execute(&self.pool)
        .await?;

        self.find_by_id(announcement.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created announcement".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Announcement>> {
        let query = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, AnnouncementRow>(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_announcement).transpose()
    }

    async fn list(&self) -> Result<Vec<Announcement>> {
        let query = format!("{} ORDER BY created_at DESC", SELECT_COLUMNS);
        let rows = sqlx::query_as::<_, AnnouncementRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(Self::row_to_announcement)
            .collect()
    }

    async fn update(&self, id: Uuid, announcement: Announcement) -> Result<Announcement> {
        let audience = &announcement.audience;
        let program_stages = Self::encode_tags(&audience.program_stages)?;
        let locations = Self::encode_tags(&audience.locations)?;

        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET title = ?, content = ?, priority = ?, category = ?,
                target_audience = ?, target_bucket = ?, target_state = ?,
                target_program_stages = ?, target_locations = ?,
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(announcement.priority.as_str())
        .bind(&announcement.category)
        .bind(audience.mode.as_str())
        .bind(&audience.bucket)
        .bind(&audience.state)
        .bind(program_stages)
        .bind(locations)
        .bind(announcement.updated_at.naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Announcement not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated announcement".to_string())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

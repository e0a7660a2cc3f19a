use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{clean_tag, DirectoryFilter, StudentProfile, StudentRecord, UpsertStudentProfileRequest},
    error::{AppError, Result},
    repository::StudentDirectory,
};

#[derive(FromRow)]
struct StudentRecordRow {
    id: String,
    email: String,
    contact_email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    program_stage: Option<String>,
    location_tag: Option<String>,
    state: Option<String>,
}

#[derive(FromRow)]
struct ProfileRow {
    id: String,
    user_id: String,
    first_name: String,
    last_name: String,
    preferred_name: Option<String>,
    phone: Option<String>,
    contact_email: Option<String>,
    city: Option<String>,
    state: Option<String>,
    program_stage: Option<String>,
    location_tag: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const RECORD_SELECT: &str = r#"
    SELECT u.id, u.email, p.contact_email, p.first_name, p.last_name,
           p.program_stage, p.location_tag, p.state
    FROM users u
    LEFT JOIN student_profiles p ON p.user_id = u.id
"#;

pub struct SqliteStudentRepository {
    pool: SqlitePool,
}

impl SqliteStudentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: StudentRecordRow) -> Result<StudentRecord> {
        Ok(StudentRecord {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            email: Some(row.email).filter(|e| !e.trim().is_empty()),
            contact_email: row.contact_email,
            first_name: row.first_name,
            last_name: row.last_name,
            program_stage: row.program_stage,
            location_tag: row.location_tag,
            state: row.state,
        })
    }

    fn row_to_profile(row: ProfileRow) -> Result<StudentProfile> {
        Ok(StudentProfile {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
            first_name: row.first_name,
            last_name: row.last_name,
            preferred_name: row.preferred_name,
            phone: row.phone,
            contact_email: row.contact_email,
            city: row.city,
            state: row.state,
            program_stage: row.program_stage,
            location_tag: row.location_tag,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn push_in_list<'a>(builder: &mut QueryBuilder<'a, Sqlite>, column: &str, values: &'a [String]) {
        builder.push(column).push(" IN (");
        let mut separated = builder.separated(", ");
        for value in values {
            separated.push_bind(value.as_str());
        }
        separated.push_unseparated(")");
    }
}

#[async_trait]
impl StudentDirectory for SqliteStudentRepository {
    async fn list_students(&self, filter: &DirectoryFilter) -> Result<Vec<StudentRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(RECORD_SELECT);
        builder.push(" WHERE u.role = ").push_bind(filter.role.as_str());

        if !filter.is_unconstrained() {
            builder.push(" AND (");
            let mut first = true;
            for (column, values) in [
                ("p.program_stage", &filter.program_stages),
                ("p.location_tag", &filter.location_tags),
                ("p.state", &filter.states),
            ] {
                if values.is_empty() {
                    continue;
                }
                if !first {
                    builder.push(" OR ");
                }
                Self::push_in_list(&mut builder, column, values);
                first = false;
            }
            builder.push(")");
        }
        builder.push(" ORDER BY u.created_at ASC");

        let rows = builder
            .build_query_as::<StudentRecordRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(Self::row_to_record)
            .collect()
    }

    async fn find_student(&self, user_id: Uuid) -> Result<Option<StudentRecord>> {
        let query = format!("{} WHERE u.id = ? AND u.role = 'student'", RECORD_SELECT);
        let row = sqlx::query_as::<_, StudentRecordRow>(&query)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<StudentProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, user_id, first_name, last_name, preferred_name, phone,
                   contact_email, city, state, program_stage, location_tag,
                   created_at, updated_at
            FROM student_profiles
            WHERE user_id = ?
            "#
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_profile).transpose()
    }

    async fn upsert_profile(&self, user_id: Uuid, profile: UpsertStudentProfileRequest) -> Result<StudentProfile> {
        let now = Utc::now().naive_utc();

        // program_stage is admin-assigned; the upsert leaves it alone.
        sqlx::query(
            r#"
            INSERT INTO student_profiles (
                id, user_id, first_name, last_name, preferred_name, phone,
                contact_email, city, state, location_tag, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                preferred_name = excluded.preferred_name,
                phone = excluded.phone,
                contact_email = excluded.contact_email,
                city = excluded.city,
                state = excluded.state,
                location_tag = excluded.location_tag,
                updated_at = excluded.updated_at
            "#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.preferred_name)
        .bind(&profile.phone)
        .bind(&profile.contact_email)
        .bind(&profile.city)
        .bind(clean_tag(profile.state))
        .bind(clean_tag(profile.location_tag))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_profile(user_id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve student profile".to_string())
        })
    }

    async fn set_program_stage(&self, user_id: Uuid, program_stage: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE student_profiles SET program_stage = ?, updated_at = ? WHERE user_id = ?"
        )
        .bind(clean_tag(Some(program_stage.to_string())))
        .bind(Utc::now().naive_utc())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_students(&self, query: &str) -> Result<Vec<StudentRecord>> {
        let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));
        let sql = format!(
            r#"{}
            WHERE u.role = 'student'
              AND (LOWER(u.email) LIKE ?1 ESCAPE '\'
                   OR LOWER(u.username) LIKE ?1 ESCAPE '\'
                   OR LOWER(p.first_name) LIKE ?1 ESCAPE '\'
                   OR LOWER(p.last_name) LIKE ?1 ESCAPE '\')
            ORDER BY u.created_at ASC"#,
            RECORD_SELECT
        );

        let rows = sqlx::query_as::<_, StudentRecordRow>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(Self::row_to_record)
            .collect()
    }

    async fn delete_student(&self, user_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let id = user_id.to_string();

        let is_student = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE id = ? AND role = 'student'"
        )
        .bind(&id)
        .fetch_one(&mut *tx)
        .await? > 0;

        if !is_student {
            return Ok(false);
        }

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM student_profiles WHERE user_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

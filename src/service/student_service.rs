use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{StudentDirectory, UserRepository},
};

pub struct StudentService {
    directory: Arc<dyn StudentDirectory>,
    users: Arc<dyn UserRepository>,
}

impl StudentService {
    pub fn new(directory: Arc<dyn StudentDirectory>, users: Arc<dyn UserRepository>) -> Self {
        Self { directory, users }
    }

    pub async fn own_profile(&self, actor: &User) -> Result<Option<StudentProfile>> {
        ensure_student(actor)?;
        self.directory.find_profile(actor.id).await
    }

    pub async fn upsert_own_profile(&self, actor: &User, request: UpsertStudentProfileRequest) -> Result<StudentProfile> {
        ensure_student(actor)?;
        request.validate()?;
        self.directory.upsert_profile(actor.id, request).await
    }

    /// Lists students; the filter's axes are OR-combined like audience matching.
    pub async fn list(&self, filter: &DirectoryFilter) -> Result<Vec<StudentRecord>> {
        self.directory.list_students(filter).await
    }

    pub async fn get(&self, id: Uuid) -> Result<StudentRecord> {
        self.directory
            .find_student(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
    }

    pub async fn search(&self, query: &str) -> Result<Vec<StudentRecord>> {
        if query.trim().chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }
        self.directory.search_students(query).await
    }

    /// Creates the account and its profile; the stage is assigned when given.
    pub async fn create_student(&self, mut request: CreateStudentRequest) -> Result<StudentRecord> {
        request.email = request.email.trim().to_lowercase();
        request.validate()?;
        let program_stage = request.program_stage
            .as_deref()
            .map(clean_stage)
            .transpose()?;

        let user = self.users.create(CreateUserRequest {
            email: request.email,
            username: request.username.trim().to_string(),
            password: request.password,
            role: UserRole::Student,
        }).await?;

        self.directory.upsert_profile(user.id, request.profile).await?;
        if let Some(stage) = program_stage {
            self.directory.set_program_stage(user.id, &stage).await?;
        }
        tracing::info!(student_id = %user.id, "Student created by admin");

        self.get(user.id).await
    }

    pub async fn delete_student(&self, id: Uuid) -> Result<()> {
        if !self.directory.delete_student(id).await? {
            return Err(AppError::NotFound("Student not found".to_string()));
        }
        tracing::info!(student_id = %id, "Student deleted");
        Ok(())
    }

    pub async fn assign_stage(&self, id: Uuid, program_stage: &str) -> Result<StudentRecord> {
        let program_stage = clean_stage(program_stage)?;

        if !self.directory.set_program_stage(id, &program_stage).await? {
            return Err(AppError::NotFound("Student profile not found".to_string()));
        }
        tracing::info!(student_id = %id, program_stage = %program_stage, "Program stage assigned");

        self.get(id).await
    }

    /// Ids without a profile are reported back rather than failing the batch.
    pub async fn bulk_assign_stage(&self, request: BulkStageAssignment) -> Result<BulkStageResult> {
        let program_stage = clean_stage(&request.program_stage)?;
        let mut result = BulkStageResult::default();

        for id in request.student_ids {
            if self.directory.set_program_stage(id, &program_stage).await? {
                result.updated.push(id);
            } else {
                result.not_found.push(id);
            }
        }

        tracing::info!(
            program_stage = %program_stage,
            updated = result.updated.len(),
            not_found = result.not_found.len(),
            "Bulk program stage assignment"
        );

        Ok(result)
    }
}

fn ensure_student(actor: &User) -> Result<()> {
    if actor.role == UserRole::Student {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only students have profiles".to_string()))
    }
}

fn clean_stage(program_stage: &str) -> Result<String> {
    let stage = program_stage.trim();
    if stage.is_empty() {
        return Err(AppError::BadRequest("program_stage is required".to_string()));
    }
    Ok(stage.to_string())
}

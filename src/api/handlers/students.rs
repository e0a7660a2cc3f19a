use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{
        BulkStageAssignment, BulkStageResult, CreateStudentRequest, DirectoryFilter, StudentProfile, StudentRecord,
        UpsertStudentProfileRequest,
    },
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub program_stage: Option<String>,
    pub location_tag: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    students: Vec<StudentRecord>,
    total: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignStageRequest {
    pub program_stage: String,
}

pub async fn my_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<StudentProfile>> {
    let profile = state.service_context.student_service
        .own_profile(&current.user)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

pub async fn upsert_my_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpsertStudentProfileRequest>,
) -> Result<Json<StudentProfile>> {
    let profile = state.service_context.student_service
        .upsert_own_profile(&current.user, request)
        .await?;

    Ok(Json(profile))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let mut filter = DirectoryFilter::students();
    filter.program_stages.extend(params.program_stage);
    filter.location_tags.extend(params.location_tag);
    filter.states.extend(params.state);

    let students = state.service_context.student_service.list(&filter).await?;
    let total = students.len();

    Ok(Json(ListResponse { students, total }))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<StudentRecord>>> {
    let students = state.service_context.student_service.search(&params.q).await?;
    Ok(Json(students))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<StudentRecord>)> {
    let student = state.service_context.student_service.create_student(request).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.student_service.delete_student(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentRecord>> {
    let student = state.service_context.student_service.get(id).await?;
    Ok(Json(student))
}

pub async fn assign_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignStageRequest>,
) -> Result<Json<StudentRecord>> {
    let student = state.service_context.student_service
        .assign_stage(id, &request.program_stage)
        .await?;

    Ok(Json(student))
}

pub async fn bulk_assign_stage(
    State(state): State<AppState>,
    Json(request): Json<BulkStageAssignment>,
) -> Result<Json<BulkStageResult>> {
    let result = state.service_context.student_service
        .bulk_assign_stage(request)
        .await?;

    Ok(Json(result))
}

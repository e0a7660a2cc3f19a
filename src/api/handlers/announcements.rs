use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{state::AppState, middleware::auth::CurrentUser},
    domain::{Announcement, AudienceRule, CreateAnnouncementRequest, UpdateAnnouncementRequest},
    error::Result,
    service::AudiencePreview,
};

#[derive(Debug, Deserialize)]
pub struct AudiencePreviewRequest {
    pub audience: AudienceRule,
    #[serde(default)]
    pub include_admins: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Announcement>>> {
    let announcements = state.service_context.announcement_service
        .list_for(&current.user)
        .await?;

    Ok(Json(announcements))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Announcement>> {
    let announcement = state.service_context.announcement_service
        .get_for(&current.user, id)
        .await?;

    Ok(Json(announcement))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>)> {
    // The dispatch handle is dropped; emails go out after the response.
    let created = state.service_context.announcement_service
        .create(&current.user, request)
        .await?;

    Ok((StatusCode::CREATED, Json(created.announcement)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>> {
    let announcement = state.service_context.announcement_service
        .update(&current.user, id, request)
        .await?;

    Ok(Json(announcement))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode> {
    state.service_context.announcement_service
        .delete(&current.user, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn preview_audience(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<AudiencePreviewRequest>,
) -> Result<Json<AudiencePreview>> {
    let preview = state.service_context.announcement_service
        .preview_audience(&current.user, request.audience, request.include_admins)
        .await?;

    Ok(Json(preview))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{AdminWithPassword, CreateAdminRequest, User},
    error::Result,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let admins = state.service_context.admin_service.list_admins().await?;
    Ok(Json(admins))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AdminWithPassword>)> {
    let admin = state.service_context.admin_service.create_admin(request).await?;
    Ok((StatusCode::CREATED, Json(admin)))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminWithPassword>> {
    let admin = state.service_context.admin_service.reset_password(id).await?;
    Ok(Json(admin))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
    Json,
};
use serde_json::{json, Value};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{CreateNotificationRecipient, NotificationRecipient, UpdateNotificationRecipient},
    error::Result,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<NotificationRecipient>>> {
    let recipients = state.service_context.notification_service.list().await?;
    Ok(Json(recipients))
}

pub async fn active(State(state): State<AppState>) -> Result<Json<Value>> {
    let emails = state.service_context.notification_service.active_emails().await?;
    Ok(Json(json!({ "active_emails": emails })))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateNotificationRecipient>,
) -> Result<(StatusCode, Json<NotificationRecipient>)> {
    let recipient = state.service_context.notification_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(recipient)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateNotificationRecipient>,
) -> Result<Json<NotificationRecipient>> {
    let recipient = state.service_context.notification_service.update(id, request).await?;
    Ok(Json(recipient))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.service_context.notification_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<NotificationRecipient>> {
    let recipient = state.service_context.notification_service.toggle(id).await?;
    Ok(Json(recipient))
}

pub async fn send_test_email(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let report = state.service_context.notification_service
        .send_test_email(&current.user)
        .await?;

    let (status, message) = if report.sent > 0 {
        ("success", "Test email sent successfully")
    } else {
        ("error", "Failed to send test email")
    };

    Ok(Json(json!({ "status": status, "message": message, "report": report })))
}

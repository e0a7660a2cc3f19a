use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    domain::{EmailLog, EmailStats, EmailStatus},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
    status: Option<String>,
}

fn default_limit() -> i64 {
    100
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<EmailLog>>> {
    if !(1..=1000).contains(&params.limit) || params.offset < 0 {
        return Err(AppError::BadRequest("limit must be 1-1000 and offset non-negative".to_string()));
    }

    // Unknown status values are ignored rather than rejected.
    let status = params.status.as_deref().and_then(EmailStatus::from_str);

    let logs = state.service_context.email_log_repo
        .list(params.limit, params.offset, status)
        .await?;

    Ok(Json(logs))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<EmailStats>> {
    let stats = state.service_context.email_log_repo.stats().await?;
    Ok(Json(stats))
}

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::SESSION_COOKIE,
    domain::User,
    error::{AppError, Result},
};

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

async fn resolve_user(state: &AppState, jar: &CookieJar) -> Result<User> {
    let session_cookie = jar
        .get(SESSION_COOKIE)
        .ok_or(AppError::Unauthorized)?;

    let session = state.service_context.auth_service
        .validate_session(session_cookie.value())
        .await?
        .ok_or(AppError::Unauthorized)?;

    let user = state.service_context.user_repo
        .find_by_id(session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.is_active {
        return Err(AppError::Unauthorized);
    }

    Ok(user)
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, AppError> {
    let user = resolve_user(&state, &jar).await?;

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, AppError> {
    let user = resolve_user(&state, &jar).await?;

    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

use axum::{
    extract::State,
    http::StatusCode,
    Extension,
    Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    auth::{AuthService, SESSION_COOKIE},
    domain::{CreateUserRequest, User, UserRole},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub message: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    request.validate()?;

    let user = state.service_context.user_repo
        .create(CreateUserRequest {
            email: request.email.trim().to_lowercase(),
            username: request.username.trim().to_string(),
            password: request.password,
            role: UserRole::Student,
        })
        .await?;

    tracing::info!(user_id = %user.id, "Student registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            message: "Registration successful".to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let email = req.email.trim().to_lowercase();
    let users = &state.service_context.user_repo;

    let password_hash = users
        .password_hash(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !AuthService::verify_password(&req.password, &password_hash).await? {
        return Err(AppError::Unauthorized);
    }

    let user = users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let auth_service = &state.service_context.auth_service;
    let (_session, token) = auth_service.create_session(user.id).await?;
    let cookie = auth_service.create_session_cookie(&token);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            role: user.role,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        let _ = state.service_context.auth_service
            .invalidate_session(session_cookie.value())
            .await;
    }

    let jar = jar.add(AuthService::create_logout_cookie());

    Ok((jar, StatusCode::NO_CONTENT))
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}

use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Apprentice Portal API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Student management backend for the culinary apprenticeship program",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "auth": "/auth/login",
            "announcements": "/api/announcements",
            "students": "/api/students",
            "admin": "/admin"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

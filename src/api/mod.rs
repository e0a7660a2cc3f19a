pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, patch, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(
    service_context: Arc<ServiceContext>,
    settings: Arc<Settings>,
) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Auth routes
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .nest("/auth", session_routes(app_state.clone()))

        // API routes
        .nest("/api", api_routes(app_state.clone()))

        // Admin routes
        .nest("/admin", admin_routes(app_state.clone()))

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn session_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::auth::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/announcements", announcement_routes(state.clone()))
        .nest("/students", student_routes(state))
}

/// Every announcement route needs a session; authoring checks happen in the service.
fn announcement_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::announcements::list).post(handlers::announcements::create),
        )
        .route("/audience-preview", post(handlers::announcements::preview_audience))
        .route(
            "/:id",
            get(handlers::announcements::get)
                .put(handlers::announcements::update)
                .delete(handlers::announcements::delete),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn student_routes(state: AppState) -> Router<AppState> {
    let own_profile = Router::new()
        .route(
            "/me",
            get(handlers::students::my_profile).put(handlers::students::upsert_my_profile),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let directory = Router::new()
        .route("/", get(handlers::students::list).post(handlers::students::create))
        .route("/search", get(handlers::students::search))
        .route("/program-stage/bulk", post(handlers::students::bulk_assign_stage))
        .route(
            "/:id",
            get(handlers::students::get).delete(handlers::students::delete),
        )
        .route("/:id/program-stage", put(handlers::students::assign_stage))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ));

    own_profile.merge(directory)
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/email-logs", get(handlers::email_logs::list))
        .route("/email-logs/stats", get(handlers::email_logs::stats))
        .route(
            "/email-notifications",
            get(handlers::notifications::list).post(handlers::notifications::create),
        )
        .route("/email-notifications/active", get(handlers::notifications::active))
        .route(
            "/email-notifications/:id",
            put(handlers::notifications::update).delete(handlers::notifications::delete),
        )
        .route("/email-notifications/:id/toggle", patch(handlers::notifications::toggle))
        .route("/test-email", post(handlers::notifications::send_test_email))
        .route(
            "/admins",
            get(handlers::admins::list).post(handlers::admins::create),
        )
        .route("/admins/:id/reset-password", post(handlers::admins::reset_password))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}

use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apprentice_portal::{
    api,
    auth::AuthService,
    config::Settings,
    notify::{sendgrid::SendGridTransport, Notifier},
    repository::SqliteEmailLogRepository,
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apprentice_portal=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting apprentice portal on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let auth_service = Arc::new(AuthService::new(
        db_pool.clone(),
        settings.auth.session_duration_hours,
        settings.auth.secure_cookies,
    ));

    match auth_service.cleanup_expired_sessions().await {
        Ok(removed) if removed > 0 => tracing::info!("Removed {} expired sessions", removed),
        Ok(_) => {}
        Err(e) => tracing::warn!("Expired session cleanup failed: {:?}", e),
    }

    // Email is optional; without it announcements are stored but not mailed.
    let notifier = match SendGridTransport::new(&settings.email) {
        Some(transport) => {
            tracing::info!("SendGrid email delivery enabled");
            let log = Arc::new(SqliteEmailLogRepository::new(db_pool.clone()));
            Some(Arc::new(
                Notifier::new(Arc::new(transport), settings.email.batch_size).with_log(log),
            ))
        }
        None => {
            tracing::warn!("Email delivery disabled or missing SendGrid API key");
            None
        }
    };

    let service_context = Arc::new(ServiceContext::new(
        auth_service,
        notifier,
        db_pool,
    ));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on {}", settings.server.base_url);

    axum::serve(listener, app).await?;

    Ok(())
}

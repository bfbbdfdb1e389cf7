use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use townhall::config::{self, AppConfig};
use townhall::notifications::{spawn_worker, NotificationLinks, QueuedDispatcher};
use townhall::services::email::EmailService;
use townhall::storage::Disks;
use townhall::{handlers, migration, routes};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::user::get_user,
        handlers::user::list_user_categories,
        handlers::user::list_user_posts,
        handlers::user::list_user_events,
        handlers::verification::send_verification_notification,
        handlers::verification::verify_email,
    ),
    components(
        schemas(
            townhall::response::ApiResponse<serde_json::Value>,
            townhall::error::AppError,
            handlers::user::UserResponse,
            handlers::user::CategoryResponse,
            handlers::user::PostResponse,
            handlers::user::EventResponse,
            handlers::verification::VerificationNotificationRequest,
        )
    ),
    tags(
        (name = "users", description = "User profiles and owned content"),
        (name = "email", description = "Account email notifications"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "townhall=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_config = AppConfig::from_env()?;
    std::fs::create_dir_all(&app_config.storage_root).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create storage directory '{}': {}",
            app_config.storage_root,
            e
        )
    })?;

    tracing::info!("Starting Townhall v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::connect().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let email_service = EmailService::from_env();
    if email_service.is_configured() {
        tracing::info!("SMTP email service configured");
    } else {
        tracing::warn!("SMTP not configured, emails will be skipped");
    }

    let links = NotificationLinks::from_config(&app_config);
    let (dispatcher, receiver) = QueuedDispatcher::channel();
    let worker = spawn_worker(receiver, email_service, links.clone());

    let disks = Disks::from_config(&app_config);
    let app = create_app(&app_config.storage_root)
        .layer(Extension(db))
        .layer(Extension(app_config))
        .layer(Extension(disks))
        .layer(Extension(dispatcher))
        .layer(Extension(links));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Dispatchers were dropped with the router; drain what is queued.
    worker.await?;
    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app(storage_root: &str) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/storage", ServeDir::new(storage_root))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "service": "Townhall",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}

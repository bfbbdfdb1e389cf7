#![allow(dead_code)]

use reqwest::Client;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Once;
use tokio::sync::mpsc::UnboundedReceiver;
use townhall::config::AppConfig;
use townhall::models::{category, event, post, NewUser, UserModel};
use townhall::notifications::{NotificationLinks, QueuedDispatcher, QueuedNotification};
use townhall::storage::Disks;

static INIT: Once = Once::new();
static MIGRATIONS_RAN: AtomicBool = AtomicBool::new(false);
static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const ADMIN_EMAIL: &str = "admin@townhall.test";

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
    });
}

pub fn test_config() -> AppConfig {
    let mut storage_disks = HashMap::new();
    storage_disks.insert(
        "public".to_string(),
        "http://localhost:3000/storage".to_string(),
    );
    AppConfig {
        url: "http://localhost:3000".to_string(),
        key: "integration_test_key_that_is_at_least_32_chars".to_string(),
        avatar: "https://www.gravatar.com/avatar/".to_string(),
        administrators: format!("{},ops@townhall.test", ADMIN_EMAIL),
        profile_photo_disk: "public".to_string(),
        storage_root: "./test_storage".to_string(),
        storage_disks,
        frontend_url: "http://localhost:5173".to_string(),
    }
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
    pub config: AppConfig,
    pub queue: UnboundedReceiver<QueuedNotification>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

pub async fn connect_db() -> DatabaseConnection {
    init_env();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    if !MIGRATIONS_RAN.swap(true, Ordering::SeqCst) {
        townhall::migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
    }

    db
}

/// Serve the API on a random port. Queued notifications are left in
/// `TestApp::queue` instead of being mailed.
pub async fn spawn_app() -> TestApp {
    let db = connect_db().await;
    let config = test_config();
    let (dispatcher, queue) = QueuedDispatcher::channel();

    let app = axum::Router::new()
        .merge(townhall::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(config.clone()))
        .layer(axum::extract::Extension(Disks::from_config(&config)))
        .layer(axum::extract::Extension(dispatcher))
        .layer(axum::extract::Extension(NotificationLinks::from_config(&config)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
        config,
        queue,
    }
}

pub fn unique(prefix: &str) -> String {
    format!("{}_{}_{}", prefix, std::process::id(), COUNTER.fetch_add(1, Ordering::SeqCst))
}

pub async fn create_user(db: &DatabaseConnection, email: &str) -> UserModel {
    NewUser {
        name: "Test User".to_string(),
        email: email.to_string(),
        password: "test_password_123".to_string(),
    }
    .into_active_model()
    .expect("valid user input")
    .insert(db)
    .await
    .expect("Failed to insert user")
}

pub async fn create_category(db: &DatabaseConnection, user_id: i32, name: &str) -> category::Model {
    let now = chrono::Utc::now().naive_utc();
    category::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_string()),
        slug: Set(unique(&name.to_lowercase())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert category")
}

pub async fn create_post(
    db: &DatabaseConnection,
    user_id: i32,
    category_id: Option<i32>,
    title: &str,
    created_at: chrono::NaiveDateTime,
) -> post::Model {
    post::ActiveModel {
        user_id: Set(user_id),
        category_id: Set(category_id),
        title: Set(title.to_string()),
        body: Set(format!("{} body", title)),
        created_at: Set(created_at),
        updated_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert post")
}

pub async fn create_event(
    db: &DatabaseConnection,
    user_id: i32,
    title: &str,
    starts_at: chrono::NaiveDateTime,
) -> event::Model {
    let now = chrono::Utc::now().naive_utc();
    event::ActiveModel {
        user_id: Set(user_id),
        title: Set(title.to_string()),
        description: Set(None),
        location: Set(Some("Main hall".to_string())),
        starts_at: Set(starts_at),
        ends_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert event")
}

pub async fn mark_verified(db: &DatabaseConnection, user_id: i32) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE users SET email_verified_at = NOW() WHERE id = $1",
        vec![user_id.into()],
    ))
    .await
    .expect("Failed to verify user");
}

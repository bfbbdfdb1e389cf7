use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::{CategoryModel, EventModel, PostModel, UserModel};
use crate::response::ApiResponse;
use crate::services::user::UserService;
use crate::storage::{Disks, StorageResolver};
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

/// External view of a user: persisted public columns plus the two computed
/// attributes. Credentials and two-factor material have no field here.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<String>,
    pub profile_photo_path: Option<String>,
    pub profile_photo_url: String,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl UserResponse {
    pub fn from_model(u: UserModel, config: &AppConfig, storage: &dyn StorageResolver) -> Self {
        let profile_photo_url = u.profile_photo_url(config, storage);
        let is_admin = u.is_admin(config);
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            email_verified_at: u.email_verified_at.map(|t| t.to_string()),
            profile_photo_path: u.profile_photo_path,
            profile_photo_url,
            is_admin,
            created_at: u.created_at.to_string(),
            updated_at: u.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

impl From<CategoryModel> for CategoryResponse {
    fn from(c: CategoryModel) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            name: c.name,
            slug: c.slug,
            created_at: c.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub user_id: i32,
    pub category_id: Option<i32>,
    pub title: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostModel> for PostResponse {
    fn from(p: PostModel) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            category_id: p.category_id,
            title: p.title,
            body: p.body,
            created_at: p.created_at.to_string(),
            updated_at: p.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: String,
    pub ends_at: Option<String>,
}

impl From<EventModel> for EventResponse {
    fn from(e: EventModel) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            title: e.title,
            description: e.description,
            location: e.location,
            starts_at: e.starts_at.to_string(),
            ends_at: e.ends_at.map(|t| t.to_string()),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "users"
)]
pub async fn get_user(
    Extension(db): Extension<DatabaseConnection>,
    Extension(config): Extension<AppConfig>,
    Extension(disks): Extension<Disks>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let user = UserService::new(db).get_by_id(id).await?;
    Ok(ApiResponse::ok(UserResponse::from_model(user, &config, &disks)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/categories",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Categories owned by the user", body = Vec<CategoryResponse>),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "users"
)]
pub async fn list_user_categories(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let items = UserService::new(db).list_categories(id).await?;
    Ok(ApiResponse::ok(
        items.into_iter().map(CategoryResponse::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/posts",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Posts written by the user, newest first", body = Vec<PostResponse>),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "users"
)]
pub async fn list_user_posts(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let items = UserService::new(db).list_posts(id).await?;
    Ok(ApiResponse::ok(
        items.into_iter().map(PostResponse::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/events",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Events organised by the user, soonest first", body = Vec<EventResponse>),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "users"
)]
pub async fn list_user_events(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let items = UserService::new(db).list_events(id).await?;
    Ok(ApiResponse::ok(
        items.into_iter().map(EventResponse::from).collect::<Vec<_>>(),
    ))
}

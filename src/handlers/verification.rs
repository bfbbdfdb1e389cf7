use crate::error::{AppError, AppResult};
use crate::notifications::{NotificationLinks, QueuedDispatcher};
use crate::response::ApiResponse;
use crate::services::user::UserService;
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const VERIFICATION_QUEUED_MESSAGE: &str =
    "If the address belongs to an unverified account, a verification link has been sent";
pub const EMAIL_VERIFIED_MESSAGE: &str = "Email address verified";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerificationNotificationRequest {
    #[validate(email)]
    pub email: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/email/verification-notification",
    request_body = VerificationNotificationRequest,
    responses(
        (status = 200, description = "Request accepted", body = serde_json::Value),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "email"
)]
pub async fn send_verification_notification(
    Extension(db): Extension<DatabaseConnection>,
    Extension(dispatcher): Extension<QueuedDispatcher>,
    Json(payload): Json<VerificationNotificationRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate()?;

    let queued = UserService::new(db)
        .resend_verification(&payload.email, &dispatcher)
        .await?;
    tracing::debug!("Verification request handled, queued={queued}");

    Ok(ApiResponse::message(VERIFICATION_QUEUED_MESSAGE))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyEmailQuery {
    pub expires: i64,
    pub signature: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/email/verify/{id}/{hash}",
    params(
        ("id" = i32, Path, description = "User ID"),
        ("hash" = String, Path, description = "SHA-256 of the account email"),
        VerifyEmailQuery
    ),
    responses(
        (status = 200, description = "Email verified", body = serde_json::Value),
        (status = 400, description = "Invalid or expired link", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "email"
)]
pub async fn verify_email(
    Extension(db): Extension<DatabaseConnection>,
    Extension(links): Extension<NotificationLinks>,
    Path((id, hash)): Path<(i32, String)>,
    Query(query): Query<VerifyEmailQuery>,
) -> AppResult<impl IntoResponse> {
    let now = chrono::Utc::now().timestamp();
    UserService::new(db)
        .verify_email(id, &hash, query.expires, &query.signature, &links, now)
        .await?;

    Ok(ApiResponse::message(EMAIL_VERIFIED_MESSAGE))
}

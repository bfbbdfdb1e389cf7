use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::{user, UserModel};
use crate::storage::Disks;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use tokio::fs;
use uuid::Uuid;

pub const PROFILE_PHOTO_DIRECTORY: &str = "profile-photos";

const MAX_FILE_SIZE: usize = 1024 * 1024; // 1 MB
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Validate file magic bytes match the declared content type.
fn validate_magic_bytes(data: &[u8], content_type: &str) -> bool {
    match content_type {
        "image/jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/png" => data.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "image/gif" => data.starts_with(b"GIF8"),
        "image/webp" => data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP",
        _ => false,
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Absolute values (`http…`) point outside our disk and are never deleted.
fn is_stored_locally(path: &str) -> bool {
    !path.is_empty() && !path.starts_with("http")
}

/// Stores and removes profile photos on the configured profile-photo disk.
/// Only disks backed by a local directory can be written to.
pub struct ProfilePhotoService {
    db: DatabaseConnection,
    disks: Disks,
    disk: String,
}

impl ProfilePhotoService {
    pub fn new(db: DatabaseConnection, disks: Disks, disk: impl Into<String>) -> Self {
        Self {
            db,
            disks,
            disk: disk.into(),
        }
    }

    pub fn from_config(db: DatabaseConnection, disks: Disks, config: &AppConfig) -> Self {
        Self::new(db, disks, config.profile_photo_disk.clone())
    }

    /// Write a new photo, point the user at it and remove the previous file.
    pub async fn update(
        &self,
        user: UserModel,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UserModel> {
        if data.len() > MAX_FILE_SIZE {
            return Err(AppError::PayloadTooLarge);
        }

        if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
            return Err(AppError::Validation(format!(
                "Unsupported file type: {}. Allowed: jpeg, png, gif, webp",
                content_type
            )));
        }

        if !validate_magic_bytes(data, content_type) {
            return Err(AppError::Validation(
                "File content does not match declared content type".to_string(),
            ));
        }

        let ext = extension_for(content_type)
            .ok_or_else(|| AppError::Validation("Unsupported file type".to_string()))?;
        let relative = format!("{}/{}.{}", PROFILE_PHOTO_DIRECTORY, Uuid::new_v4(), ext);

        let root = self.disks.root(&self.disk).ok_or_else(|| {
            anyhow::anyhow!(
                "Profile photo disk '{}' has no local root to write to",
                self.disk
            )
        })?;
        fs::create_dir_all(root.join(PROFILE_PHOTO_DIRECTORY))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create profile photo directory: {}", e))?;

        let file_path = self
            .disks
            .local_path(&self.disk, &relative)
            .ok_or_else(|| AppError::Validation("Invalid storage path".to_string()))?;
        fs::write(&file_path, data)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write profile photo: {}", e))?;

        let previous = user.profile_photo_path.clone();
        let updated = self.set_path(user, Some(relative)).await?;

        if let Some(previous) = previous {
            self.remove_file(&previous).await;
        }

        tracing::info!("Updated profile photo for user {}", updated.id);
        Ok(updated)
    }

    /// Clear the user's photo so the default avatar is served again.
    pub async fn delete(&self, user: UserModel) -> AppResult<UserModel> {
        let Some(previous) = user.profile_photo_path.clone() else {
            return Ok(user);
        };

        let updated = self.set_path(user, None).await?;
        self.remove_file(&previous).await;
        Ok(updated)
    }

    async fn set_path(&self, user: UserModel, path: Option<String>) -> AppResult<UserModel> {
        let mut active: user::ActiveModel = user.into();
        active.profile_photo_path = Set(path);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    async fn remove_file(&self, path: &str) {
        if !is_stored_locally(path) {
            return;
        }
        let Some(file_path) = self.disks.local_path(&self.disk, path) else {
            tracing::warn!("Refusing to delete profile photo {path} on disk '{}'", self.disk);
            return;
        };
        if let Err(e) = fs::remove_file(&file_path).await {
            tracing::warn!("Failed to delete old profile photo {}: {e}", file_path.display());
        }
    }
}

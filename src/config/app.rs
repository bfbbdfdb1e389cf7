use anyhow::Result;
use std::collections::HashMap;
use std::env;

pub const DEFAULT_AVATAR_BASE: &str = "https://www.gravatar.com/avatar/";
pub const DEFAULT_PROFILE_PHOTO_DISK: &str = "public";

/// Application-level settings read by the user record and its collaborators.
///
/// `avatar` and `administrators` are consumed verbatim: the administrator
/// list is split on commas without trimming.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub url: String,
    pub key: String,
    pub avatar: String,
    pub administrators: String,
    pub profile_photo_disk: String,
    pub storage_root: String,
    pub storage_disks: HashMap<String, String>,
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let key = env::var("APP_KEY")
            .map_err(|_| anyhow::anyhow!("APP_KEY environment variable must be set"))?;

        if key.len() < 32 {
            return Err(anyhow::anyhow!("APP_KEY must be at least 32 characters"));
        }

        let url = env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let mut storage_disks = HashMap::new();
        storage_disks.insert(
            DEFAULT_PROFILE_PHOTO_DISK.to_string(),
            format!("{}/storage", url),
        );
        if let Ok(raw) = env::var("STORAGE_DISKS") {
            match parse_disks(&raw) {
                Ok(extra) => storage_disks.extend(extra),
                Err(err) => tracing::warn!("Invalid STORAGE_DISKS '{}': {}", raw, err),
            }
        }

        Ok(Self {
            key,
            avatar: env::var("APP_AVATAR").unwrap_or_else(|_| DEFAULT_AVATAR_BASE.to_string()),
            administrators: env::var("APP_ADMINISTRATORS").unwrap_or_default(),
            profile_photo_disk: env::var("PROFILE_PHOTO_DISK")
                .unwrap_or_else(|_| DEFAULT_PROFILE_PHOTO_DISK.to_string()),
            storage_root: env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "./storage/app/public".to_string()),
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| url.clone()),
            storage_disks,
            url,
        })
    }
}

/// Parse `name=base_url,name2=base_url2`.
fn parse_disks(raw: &str) -> Result<HashMap<String, String>, String> {
    let mut disks = HashMap::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (name, base) = item
            .split_once('=')
            .ok_or_else(|| format!("invalid item '{}', expected name=base_url", item))?;
        let name = name.trim();
        let base = base.trim().trim_end_matches('/');
        if name.is_empty() || base.is_empty() {
            return Err(format!("invalid item '{}', empty name or base_url", item));
        }
        disks.insert(name.to_string(), base.to_string());
    }
    Ok(disks)
}

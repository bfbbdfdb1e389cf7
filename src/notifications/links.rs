use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

pub const VERIFY_LINK_TTL_SECONDS: i64 = 60 * 60;

/// Builds the links embedded in notification emails.
///
/// Verification links are signed with HMAC-SHA256 over
/// `"{user_id}:{email_hash}:{expires}"` using the application key and point
/// at the API, which holds that key. Reset links go to the frontend.
#[derive(Clone)]
pub struct NotificationLinks {
    app_url: String,
    frontend_url: String,
    key: Vec<u8>,
}

impl NotificationLinks {
    pub fn new(app_url: &str, frontend_url: &str, key: &[u8]) -> Self {
        Self {
            app_url: app_url.trim_end_matches('/').to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            key: key.to_vec(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.url, &config.frontend_url, config.key.as_bytes())
    }

    pub fn verification_url(&self, user_id: i32, email: &str, now: i64) -> AppResult<String> {
        let hash = email_hash(email);
        let expires = now + VERIFY_LINK_TTL_SECONDS;
        let signature = self.sign(user_id, &hash, expires)?;
        Ok(format!(
            "{}/api/v1/email/verify/{}/{}?expires={}&signature={}",
            self.app_url, user_id, hash, expires, signature
        ))
    }

    /// Check a verification link's parts. Fails on a bad signature or once
    /// `now` is past `expires`.
    pub fn verify_signature(
        &self,
        user_id: i32,
        hash: &str,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> AppResult<()> {
        let sig = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AppError::Validation("Invalid verification signature".to_string()))?;

        let mut mac = self.mac()?;
        mac.update(format!("{}:{}:{}", user_id, hash, expires).as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| AppError::Validation("Invalid verification signature".to_string()))?;

        if expires < now {
            return Err(AppError::Validation("Verification link expired".to_string()));
        }
        Ok(())
    }

    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_url, token)
    }

    fn sign(&self, user_id: i32, hash: &str, expires: i64) -> AppResult<String> {
        let mut mac = self.mac()?;
        mac.update(format!("{}:{}:{}", user_id, hash, expires).as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> AppResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| AppError::Internal(e.into()))
    }
}

/// Lowercase hex SHA-256 of the email as stored.
pub fn email_hash(email: &str) -> String {
    format!("{:x}", Sha256::digest(email.as_bytes()))
}

use md5::{Digest, Md5};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::notifications::{Notification, NotificationDispatcher};
use crate::storage::StorageResolver;
use crate::utils::hash_password;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub email_verified_at: Option<DateTime>,
    #[serde(skip_serializing)]
    pub remember_token: Option<String>,
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text", nullable)]
    pub two_factor_secret: Option<String>,
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text", nullable)]
    pub two_factor_recovery_codes: Option<String>,
    pub profile_photo_path: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::category::Entity")]
    Categories,
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,
    #[sea_orm(has_many = "super::event::Entity")]
    Events,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

const EMAIL_TRIM_CHARS: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

impl Model {
    /// URL of the user's profile photo.
    ///
    /// A stored value beginning with `http` is already absolute and is
    /// returned as-is; any other value is a path on the profile-photo disk.
    /// Without a stored value the gravatar-style default is used.
    pub fn profile_photo_url(&self, config: &AppConfig, storage: &dyn StorageResolver) -> String {
        match self.profile_photo_path.as_deref() {
            None | Some("") => self.default_profile_photo_url(config),
            Some(path) if path.starts_with("http") => path.to_string(),
            Some(path) => storage.url(&config.profile_photo_disk, path),
        }
    }

    /// `app.avatar` followed by the MD5 of the trimmed, lowercased email.
    /// Both steps are ASCII-only: non-ASCII letters keep their case.
    pub fn default_profile_photo_url(&self, config: &AppConfig) -> String {
        let normalized = self
            .email
            .trim_matches(EMAIL_TRIM_CHARS)
            .to_ascii_lowercase();
        format!("{}{:x}", config.avatar, Md5::digest(normalized.as_bytes()))
    }

    /// Entries of `app.administrators` are compared exactly as split; a
    /// padded entry such as `" a@x.com"` never matches.
    pub fn is_admin(&self, config: &AppConfig) -> bool {
        config
            .administrators
            .split(',')
            .any(|entry| entry == self.email)
    }

    pub fn has_verified_email(&self) -> bool {
        self.email_verified_at.is_some()
    }

    pub fn send_email_verification_notification(
        &self,
        dispatcher: &dyn NotificationDispatcher,
    ) -> AppResult<()> {
        dispatcher.dispatch(Notification::VerifyEmail, self)
    }

    pub fn send_password_reset_notification(
        &self,
        dispatcher: &dyn NotificationDispatcher,
        token: &str,
    ) -> AppResult<()> {
        dispatcher.dispatch(
            Notification::ResetPassword {
                token: token.to_string(),
            },
            self,
        )
    }

    pub async fn categories<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<Vec<super::category::Model>, DbErr> {
        self.find_related(super::category::Entity).all(db).await
    }

    pub async fn posts<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<super::post::Model>, DbErr> {
        self.find_related(super::post::Entity).all(db).await
    }

    pub async fn events<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<Vec<super::event::Model>, DbErr> {
        self.find_related(super::event::Entity).all(db).await
    }
}

/// The mass-assignable attributes of a new user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

impl NewUser {
    /// Validate and hash into an insertable row. Sensitive columns start
    /// empty and the email is unverified.
    pub fn into_active_model(self) -> AppResult<ActiveModel> {
        self.validate()?;

        let password = hash_password(&self.password)?;
        let now = chrono::Utc::now().naive_utc();

        Ok(ActiveModel {
            id: NotSet,
            name: Set(self.name),
            email: Set(self.email),
            password: Set(password),
            email_verified_at: Set(None),
            remember_token: Set(None),
            two_factor_secret: Set(None),
            two_factor_recovery_codes: Set(None),
            profile_photo_path: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedStorage;

    impl StorageResolver for FixedStorage {
        fn url(&self, disk: &str, path: &str) -> String {
            format!("https://{}.storage.test/{}", disk, path)
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(Notification, i32)>>,
    }

    impl NotificationDispatcher for RecordingDispatcher {
        fn dispatch(&self, notification: Notification, user: &Model) -> AppResult<()> {
            self.sent.lock().unwrap().push((notification, user.id));
            Ok(())
        }
    }

    fn config(administrators: &str) -> AppConfig {
        AppConfig {
            url: "http://localhost:3000".to_string(),
            key: "k".repeat(32),
            avatar: "https://www.gravatar.com/avatar/".to_string(),
            administrators: administrators.to_string(),
            profile_photo_disk: "public".to_string(),
            storage_root: "./storage".to_string(),
            storage_disks: HashMap::new(),
            frontend_url: "http://localhost:5173".to_string(),
        }
    }

    fn user(email: &str, photo: Option<&str>) -> Model {
        let now = chrono::Utc::now().naive_utc();
        Model {
            id: 7,
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "$2b$12$hash".to_string(),
            email_verified_at: None,
            remember_token: Some("remember".to_string()),
            two_factor_secret: Some("secret".to_string()),
            two_factor_recovery_codes: Some("[\"code\"]".to_string()),
            profile_photo_path: photo.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn default_photo_uses_normalized_email_md5() {
        let cfg = config("");
        // md5("myemailaddress@example.com")
        let expected = "https://www.gravatar.com/avatar/0bc83cb571cd1c50ba6f3e8a78ef1346";
        assert_eq!(
            user("  MyEmailAddress@example.com ", None).profile_photo_url(&cfg, &FixedStorage),
            expected
        );
        assert_eq!(
            user("myemailaddress@example.com", Some("")).profile_photo_url(&cfg, &FixedStorage),
            expected
        );
    }

    #[test]
    fn default_photo_normalizes_ascii_only() {
        let cfg = config("");
        // md5("Äb@x.com"): the non-ASCII capital is left as-is
        assert_eq!(
            user("ÄB@x.com", None).default_profile_photo_url(&cfg),
            "https://www.gravatar.com/avatar/1bf3e198f8c53a2deae114ad0f345eb8"
        );
        // md5("a@x.com"): NUL and vertical tab are trimmed too
        assert_eq!(
            user("\0\x0BA@X.com\0", None).default_profile_photo_url(&cfg),
            "https://www.gravatar.com/avatar/743173788aa9166801df2e18f0e7ff24"
        );
    }

    #[test]
    fn absolute_photo_returned_unchanged() {
        let cfg = config("");
        let u = user("a@x.com", Some("https://avatars.example.com/u/1.png"));
        assert_eq!(
            u.profile_photo_url(&cfg, &FixedStorage),
            "https://avatars.example.com/u/1.png"
        );
    }

    #[test]
    fn relative_photo_resolved_through_storage() {
        let cfg = config("");
        let u = user("a@x.com", Some("profile-photos/a.png"));
        assert_eq!(
            u.profile_photo_url(&cfg, &FixedStorage),
            "https://public.storage.test/profile-photos/a.png"
        );
    }

    #[test]
    fn short_relative_path_is_not_absolute() {
        let cfg = config("");
        let u = user("a@x.com", Some("htt"));
        assert_eq!(
            u.profile_photo_url(&cfg, &FixedStorage),
            "https://public.storage.test/htt"
        );
    }

    #[test]
    fn zero_path_is_a_stored_file() {
        let cfg = config("");
        let u = user("a@x.com", Some("0"));
        assert_eq!(
            u.profile_photo_url(&cfg, &FixedStorage),
            "https://public.storage.test/0"
        );
    }

    #[test]
    fn admin_matches_exact_entries() {
        let cfg = config("a@x.com,b@x.com");
        assert!(user("b@x.com", None).is_admin(&cfg));
        assert!(user("a@x.com", None).is_admin(&cfg));
        assert!(!user(" b@x.com", None).is_admin(&cfg));
        assert!(!user("c@x.com", None).is_admin(&cfg));
    }

    #[test]
    fn padded_admin_entries_never_match() {
        let cfg = config("a@x.com, b@x.com");
        assert!(!user("b@x.com", None).is_admin(&cfg));
        assert!(user(" b@x.com", None).is_admin(&cfg));
    }

    #[test]
    fn empty_admin_list_has_no_admins() {
        assert!(!user("a@x.com", None).is_admin(&config("")));
    }

    #[test]
    fn serialized_model_hides_secrets() {
        let value = serde_json::to_value(user("a@x.com", None)).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "password",
            "remember_token",
            "two_factor_secret",
            "two_factor_recovery_codes",
        ] {
            assert!(!obj.contains_key(key), "{key} leaked");
        }
        assert_eq!(obj["email"], "a@x.com");
    }

    #[test]
    fn verification_notification_dispatched_once() {
        let dispatcher = RecordingDispatcher::default();
        let u = user("a@x.com", None);
        u.send_email_verification_notification(&dispatcher).unwrap();

        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], (Notification::VerifyEmail, 7));
    }

    #[test]
    fn reset_notification_carries_token() {
        let dispatcher = RecordingDispatcher::default();
        let u = user("a@x.com", None);
        u.send_password_reset_notification(&dispatcher, "tok-123").unwrap();

        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            (
                Notification::ResetPassword {
                    token: "tok-123".to_string()
                },
                7
            )
        );
    }

    #[test]
    fn verified_flag_follows_timestamp() {
        let mut u = user("a@x.com", None);
        assert!(!u.has_verified_email());
        u.email_verified_at = Some(chrono::Utc::now().naive_utc());
        assert!(u.has_verified_email());
    }

    #[test]
    fn new_user_rejects_invalid_email() {
        let input = NewUser {
            name: "Ada".to_string(),
            email: "not-an-email".to_string(),
            password: "long enough password".to_string(),
        };
        assert!(matches!(input.into_active_model(), Err(AppError::Validation(_))));
    }

    #[test]
    fn new_user_hashes_password() {
        let input = NewUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
        };
        let active = input.into_active_model().unwrap();
        let hash = active.password.unwrap();
        assert_ne!(hash, "correct horse");
        assert!(crate::utils::verify_password("correct horse", &hash).unwrap());
        assert_eq!(active.email_verified_at.unwrap(), None);
    }
}

use crate::{
    error::{AppError, AppResult},
    models::{category, event, post, user, CategoryModel, EventModel, PostModel, User, UserModel},
    notifications::{email_hash, NotificationDispatcher, NotificationLinks},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};

pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<UserModel> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<UserModel>> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    pub async fn list_categories(&self, user_id: i32) -> AppResult<Vec<CategoryModel>> {
        let owner = self.get_by_id(user_id).await?;
        Ok(owner
            .find_related(category::Entity)
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn list_posts(&self, user_id: i32) -> AppResult<Vec<PostModel>> {
        let owner = self.get_by_id(user_id).await?;
        Ok(owner
            .find_related(post::Entity)
            .order_by_desc(post::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn list_events(&self, user_id: i32) -> AppResult<Vec<EventModel>> {
        let owner = self.get_by_id(user_id).await?;
        Ok(owner
            .find_related(event::Entity)
            .order_by_asc(event::Column::StartsAt)
            .all(&self.db)
            .await?)
    }

    /// Queue a verification email for an unverified account. Returns false,
    /// without dispatching, for unknown or already-verified addresses.
    pub async fn resend_verification(
        &self,
        email: &str,
        dispatcher: &dyn NotificationDispatcher,
    ) -> AppResult<bool> {
        match self.find_by_email(email).await? {
            Some(user) if !user.has_verified_email() => {
                user.send_email_verification_notification(dispatcher)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Complete a signed verification link. The hash must still match the
    /// account's current email; an already-verified account is left as is.
    pub async fn verify_email(
        &self,
        user_id: i32,
        hash: &str,
        expires: i64,
        signature: &str,
        links: &NotificationLinks,
        now: i64,
    ) -> AppResult<UserModel> {
        links.verify_signature(user_id, hash, expires, signature, now)?;

        let user = self.get_by_id(user_id).await?;
        if email_hash(&user.email) != hash {
            return Err(AppError::Validation(
                "Verification link does not match this account".to_string(),
            ));
        }
        if user.has_verified_email() {
            return Ok(user);
        }

        let now = chrono::Utc::now().naive_utc();
        let mut active: user::ActiveModel = user.into();
        active.email_verified_at = Set(Some(now));
        active.updated_at = Set(now);
        let verified = active.update(&self.db).await?;

        tracing::info!("Email verified for user {}", verified.id);
        Ok(verified)
    }
}

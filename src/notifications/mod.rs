//! Queued account notifications.
//!
//! The user record only hands a [`Notification`] to a
//! [`NotificationDispatcher`]; delivery happens later on the worker task
//! spawned by [`worker::spawn_worker`].

pub mod links;
pub mod worker;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{AppError, AppResult};
use crate::models::UserModel;

pub use links::{email_hash, NotificationLinks};
pub use worker::{spawn_worker, Mailer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    VerifyEmail,
    ResetPassword { token: String },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::VerifyEmail => "verify_email",
            Notification::ResetPassword { .. } => "reset_password",
        }
    }
}

/// Accepts a notification for a user and delivers it asynchronously.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification, user: &UserModel) -> AppResult<()>;
}

/// Snapshot of what the worker needs to deliver one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedNotification {
    pub notification: Notification,
    pub user_id: i32,
    pub email: String,
    pub name: String,
}

#[derive(Clone)]
pub struct QueuedDispatcher {
    sender: UnboundedSender<QueuedNotification>,
}

impl QueuedDispatcher {
    pub fn channel() -> (Self, UnboundedReceiver<QueuedNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationDispatcher for QueuedDispatcher {
    fn dispatch(&self, notification: Notification, user: &UserModel) -> AppResult<()> {
        let kind = notification.kind();
        self.sender
            .send(QueuedNotification {
                notification,
                user_id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
            })
            .map_err(|_| AppError::Internal(anyhow::anyhow!("notification queue is closed")))?;

        tracing::debug!("Queued {kind} notification for user {}", user.id);
        Ok(())
    }
}

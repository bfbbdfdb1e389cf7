use std::future::Future;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::{Notification, NotificationLinks, QueuedNotification};
use crate::error::AppResult;

/// Outbound mail transport used by the notification worker.
pub trait Mailer: Send + Sync + 'static {
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Drain the notification queue until every dispatcher is dropped.
///
/// A failed delivery is logged and skipped; it never stops the worker.
pub fn spawn_worker<M: Mailer>(
    mut receiver: UnboundedReceiver<QueuedNotification>,
    mailer: M,
    links: NotificationLinks,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            let kind = message.notification.kind();
            let now = chrono::Utc::now().timestamp();

            let (subject, body) = match render(&message, &links, now) {
                Ok(rendered) => rendered,
                Err(e) => {
                    tracing::warn!("Failed to render {kind} for user {}: {e}", message.user_id);
                    continue;
                }
            };

            match mailer.send(&message.email, &subject, &body).await {
                Ok(()) => tracing::info!("Delivered {kind} to user {}", message.user_id),
                Err(e) => {
                    tracing::warn!("Failed to deliver {kind} to user {}: {e}", message.user_id)
                }
            }
        }
        tracing::info!("Notification queue closed, worker stopping");
    })
}

/// Subject and plain-text body for a queued notification.
pub fn render(
    message: &QueuedNotification,
    links: &NotificationLinks,
    now: i64,
) -> AppResult<(String, String)> {
    match &message.notification {
        Notification::VerifyEmail => {
            let link = links.verification_url(message.user_id, &message.email, now)?;
            Ok((
                "Verify Email Address".to_string(),
                format!(
                    "Hello {},\n\nPlease click the link below to verify your email address:\n\n{}\n\nThis link expires in 60 minutes. If you did not create an account, no further action is required.",
                    message.name, link
                ),
            ))
        }
        Notification::ResetPassword { token } => Ok((
            "Reset Password Notification".to_string(),
            format!(
                "Hello {},\n\nYou are receiving this email because we received a password reset request for your account:\n\n{}\n\nIf you did not request a password reset, no further action is required.",
                message.name,
                links.reset_url(token)
            ),
        )),
    }
}

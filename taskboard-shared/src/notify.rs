/// Registration notifications
///
/// After a user registers, the user service hands the new account to a
/// [`Notifier`] on a detached task. Whatever happens there is logged and
/// never reaches the caller of `register`.
///
/// - [`NoopNotifier`]: drops every notification (default when no webhook is
///   configured)
/// - [`WebhookNotifier`]: POSTs a JSON event to a configured URL
///
/// # Webhook payload
///
/// ```json
/// {
///   "event": "user.registered",
///   "occurred_at": "2025-01-01T00:00:00Z",
///   "user": { "id": "<uuid>", "name": "Alice", "email": "alice@example.com" }
/// }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::models::user::UserSummary;

/// Error type for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification endpoint returned HTTP {0}")]
    Status(u16),
}

/// Sink for account lifecycle notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn user_registered(&self, user: &UserSummary) -> Result<(), NotifyError>;
}

/// Notifier that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn user_registered(&self, user: &UserSummary) -> Result<(), NotifyError> {
        debug!(user_id = %user.id, "Registration notification skipped");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RegistrationEvent<'a> {
    event: &'static str,
    occurred_at: DateTime<Utc>,
    user: &'a UserSummary,
}

/// Delivers notifications as JSON webhooks
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn user_registered(&self, user: &UserSummary) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RegistrationEvent {
                event: "user.registered",
                occurred_at: Utc::now(),
                user,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }

        debug!(user_id = %user.id, url = %self.url, "Registration notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_noop_notifier_succeeds() {
        let user = UserSummary {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        assert!(NoopNotifier.user_registered(&user).await.is_ok());
    }

    #[test]
    fn test_registration_event_shape() {
        let user = UserSummary {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        let json = serde_json::to_value(RegistrationEvent {
            event: "user.registered",
            occurred_at: Utc::now(),
            user: &user,
        })
        .expect("serialize event");

        assert_eq!(json["event"], "user.registered");
        assert_eq!(json["user"]["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn test_webhook_unreachable_endpoint_errors() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook").expect("client");
        assert_eq!(notifier.url(), "http://127.0.0.1:9/hook");
        let user = UserSummary {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        assert!(notifier.user_registered(&user).await.is_err());
    }
}

/// Outbound notification delivery
///
/// Invites and password resets leave the system through a [`Notifier`].
/// Delivery is best-effort everywhere it is used: the access-control
/// operation that triggered the send has already committed, so a delivery
/// failure is logged and surfaced to the caller as advisory information,
/// never as a rollback.
///
/// Two implementations ship here: [`WebhookNotifier`] posts a JSON payload
/// to a configured endpoint (a mail relay, a Zapier hook, anything that
/// speaks HTTP), and [`NoopNotifier`] is for tests and for deployments that
/// have not wired delivery up yet.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::debug;

use crate::models::collaborator::CollaboratorRole;

/// Default timeout for webhook delivery
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Error type for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The transport could not be constructed or reached
    #[error("Notification transport error: {0}")]
    Transport(String),

    /// The receiving end answered with a non-success status
    #[error("Notification endpoint returned status {0}")]
    Endpoint(u16),
}

/// Kinds of messages the core sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Invite,
    PasswordReset,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Invite => "invite",
            MessageKind::PasswordReset => "password_reset",
        }
    }
}

/// Outbound delivery seam
///
/// Implementations must be safe to share across tasks; managers hold them
/// behind an `Arc<dyn Notifier>`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers an invite to the given address
    async fn send_invite(
        &self,
        email: &str,
        community_name: &str,
        token: &str,
        role: CollaboratorRole,
    ) -> Result<(), NotifyError>;

    /// Delivers a password-reset message to the given address
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), NotifyError>;
}

/// Builds the invite payload posted to webhook endpoints
pub(crate) fn invite_payload(
    email: &str,
    community_name: &str,
    token: &str,
    role: CollaboratorRole,
) -> JsonValue {
    json!({
        "kind": MessageKind::Invite.as_str(),
        "to": email,
        "community_name": community_name,
        "token": token,
        "role": role.as_str(),
    })
}

/// Builds the password-reset payload posted to webhook endpoints
pub(crate) fn password_reset_payload(email: &str, token: &str) -> JsonValue {
    json!({
        "kind": MessageKind::PasswordReset.as_str(),
        "to": email,
        "token": token,
    })
}

/// Notifier that POSTs JSON payloads to a single HTTP endpoint
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    /// Creates a webhook notifier for the given endpoint
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] if the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    async fn post(&self, payload: &JsonValue) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Endpoint(status.as_u16()));
        }

        debug!(endpoint = %self.endpoint, "notification delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_invite(
        &self,
        email: &str,
        community_name: &str,
        token: &str,
        role: CollaboratorRole,
    ) -> Result<(), NotifyError> {
        self.post(&invite_payload(email, community_name, token, role))
            .await
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), NotifyError> {
        self.post(&password_reset_payload(email, token)).await
    }
}

/// Notifier that delivers nothing
///
/// Logs at debug level so local runs still show what would have been sent.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_invite(
        &self,
        email: &str,
        community_name: &str,
        _token: &str,
        role: CollaboratorRole,
    ) -> Result<(), NotifyError> {
        debug!(%email, %community_name, role = %role, "invite delivery skipped (noop notifier)");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, _token: &str) -> Result<(), NotifyError> {
        debug!(%email, "password reset delivery skipped (noop notifier)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_payload_shape() {
        let payload = invite_payload(
            "sam@example.com",
            "Garden Club",
            "rinv_abc",
            CollaboratorRole::Admin,
        );

        assert_eq!(payload["kind"], "invite");
        assert_eq!(payload["to"], "sam@example.com");
        assert_eq!(payload["community_name"], "Garden Club");
        assert_eq!(payload["token"], "rinv_abc");
        assert_eq!(payload["role"], "admin");
    }

    #[test]
    fn test_password_reset_payload_shape() {
        let payload = password_reset_payload("sam@example.com", "reset-token");

        assert_eq!(payload["kind"], "password_reset");
        assert_eq!(payload["to"], "sam@example.com");
        assert_eq!(payload["token"], "reset-token");
    }

    #[tokio::test]
    async fn test_noop_notifier_always_succeeds() {
        let notifier = NoopNotifier;

        notifier
            .send_invite("a@b.c", "X", "rinv_t", CollaboratorRole::Viewer)
            .await
            .unwrap();
        notifier.send_password_reset("a@b.c", "t").await.unwrap();
    }

    #[test]
    fn test_webhook_notifier_builds() {
        let notifier = WebhookNotifier::new("http://localhost:9/hook", 5);
        assert!(notifier.is_ok());
    }
}

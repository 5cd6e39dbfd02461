//! Notification sink
//!
//! Best-effort user notifications. Failures are logged by the caller and
//! never propagated to the financial operation that triggered them.

use async_trait::async_trait;
use serde::Serialize;

/// Errors from the notification channel.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// What happened, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CreditIssued,
    PaymentOverdue,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CreditIssued => "credit_issued",
            EventKind::PaymentOverdue => "payment_overdue",
        }
    }
}

/// Delivery channel for user-facing event notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        user_email: &str,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// Sink that writes notifications to the structured log instead of an
/// outbound channel. The default when no mail transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(
        &self,
        user_email: &str,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            email = %user_email,
            event = event.as_str(),
            payload = %payload,
            "User notification"
        );
        Ok(())
    }
}

//! Recording notification sender.
//!
//! Captures every email instead of sending it; tests assert on the
//! captured list. Supports failure injection for sweep error-accumulation
//! tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{EmailTemplate, NotificationSender};

/// One captured email.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub template: EmailTemplate,
    pub data: serde_json::Value,
}

/// Notification sender that records instead of delivering.
#[derive(Default)]
pub struct RecordingNotificationSender {
    sent: RwLock<Vec<SentEmail>>,
    fail_sends: AtomicBool,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail.
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Returns a snapshot of all captured emails.
    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send_email(
        &self,
        to: &str,
        template: EmailTemplate,
        data: serde_json::Value,
    ) -> Result<(), DomainError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "Injected email send failure",
            ));
        }

        self.sent.write().await.push(SentEmail {
            to: to.to_string(),
            template,
            data,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_are_recorded() {
        let sender = RecordingNotificationSender::new();
        sender
            .send_email(
                "admin@example.com",
                EmailTemplate::TrialReminder,
                serde_json::json!({"days_remaining": 3}),
            )
            .await
            .unwrap();

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "admin@example.com");
        assert_eq!(sent[0].template, EmailTemplate::TrialReminder);
    }

    #[tokio::test]
    async fn injected_failure_surfaces() {
        let sender = RecordingNotificationSender::new();
        sender.fail_sends();

        let result = sender
            .send_email("a@example.com", EmailTemplate::TrialExpired, serde_json::json!({}))
            .await;

        assert!(result.is_err());
        assert!(sender.sent().await.is_empty());
    }
}

//! Notification sender port.
//!
//! Used by the trial-reminder and suspension flows. Delivery mechanics
//! (provider, retries, batching) are the adapter's problem.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;

/// Email templates the billing core sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    /// Trial is ending in N days.
    TrialReminder,

    /// Trial ended; community was suspended.
    TrialExpired,
}

impl EmailTemplate {
    /// Template name as known to the email provider.
    pub fn template_name(&self) -> &'static str {
        match self {
            EmailTemplate::TrialReminder => "trial_reminder",
            EmailTemplate::TrialExpired => "trial_expired",
        }
    }
}

/// Port for outbound email notifications.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Send a templated email.
    ///
    /// `data` carries the template variables (days remaining, community
    /// name, and so on).
    async fn send_email(
        &self,
        to: &str,
        template: EmailTemplate,
        data: serde_json::Value,
    ) -> Result<(), DomainError>;
}

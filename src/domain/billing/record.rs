//! Subscription record aggregate.
//!
//! A `SubscriptionRecord` is the local mirror of one gateway subscription:
//! its status, current billing period, charge/failure counters, and an
//! append-only history of webhook events and notifications. One community
//! should have at most one in-force record at a time, but historically many
//! records may exist for the same community - the reconciliation service
//! exists precisely because that invariant is not enforced at write time.
//!
//! # Design Decisions
//!
//! - **Dates are `Option<Timestamp>`**: upstream webhook data is not always
//!   trustworthy; a missing or implausible period end is a detectable fault,
//!   not a panic.
//! - **Histories are append-only**: webhook events, notifications, and trial
//!   reminders are never rewritten.
//! - **Status changes go through the state machine**: no direct field pokes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CommunityId, DomainError, ErrorCode, StateMachine, Timestamp, UserId,
};

use super::RecordStatus;

/// Earliest period date considered plausible (1971-01-01T00:00:00Z).
///
/// Gateways have been observed delivering zero or near-zero epoch values for
/// subscriptions that were never charged; anything before this floor is
/// treated as corrupt.
pub const EARLIEST_PLAUSIBLE_UNIX_SECS: u64 = 31_536_000;

/// Fallback billing period length when the gateway delivers unusable dates.
pub const FALLBACK_PERIOD_DAYS: i64 = 30;

/// One webhook event received for this subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventEntry {
    /// Gateway event name (e.g. `subscription.charged`).
    pub event: String,

    /// When the event was received.
    pub received_at: Timestamp,

    /// Whether the event was applied to local state.
    pub processed: bool,

    /// Raw event payload as delivered.
    pub payload: serde_json::Value,
}

/// One notification email sent in relation to this subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEntry {
    /// Notification kind (template name).
    pub kind: String,

    /// When it was sent.
    pub sent_at: Timestamp,
}

/// One trial reminder sent for this subscription's community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialReminderEntry {
    /// How many days before trial end the reminder fired.
    pub days_before_end: u32,

    /// When it was sent.
    pub sent_at: Timestamp,
}

/// Local mirror of one gateway subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Gateway subscription id (unique across the store).
    pub gateway_subscription_id: String,

    /// Gateway plan id this subscription charges against.
    pub gateway_plan_id: String,

    /// Gateway customer id, when the gateway reported one.
    pub gateway_customer_id: Option<String>,

    /// Admin user who initiated the subscription.
    pub admin_id: UserId,

    /// Community this subscription pays for.
    pub community_id: CommunityId,

    /// Current lifecycle status.
    pub status: RecordStatus,

    /// Start of the current billing period.
    pub current_start: Option<Timestamp>,

    /// End of the current billing period.
    pub current_end: Option<Timestamp>,

    /// Authentication attempts observed at the gateway.
    pub auth_attempts: u32,

    /// Total number of charges planned by the gateway (0 = open-ended).
    pub total_count: u32,

    /// Charges collected so far.
    pub paid_count: u32,

    /// Charge retries since the last success.
    pub retry_attempts: u32,

    /// Consecutive failed charges since the last success.
    pub consecutive_failures: u32,

    /// Append-only history of webhook events.
    pub webhook_events: Vec<WebhookEventEntry>,

    /// Append-only history of notifications sent.
    pub notifications_sent: Vec<NotificationEntry>,

    /// Append-only history of trial reminders sent.
    pub trial_reminders_sent: Vec<TrialReminderEntry>,

    /// When the record was created locally.
    pub created_at: Timestamp,

    /// When the record was last updated locally.
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// Creates a record for a freshly initiated gateway subscription.
    pub fn new(
        gateway_subscription_id: impl Into<String>,
        gateway_plan_id: impl Into<String>,
        gateway_customer_id: Option<String>,
        admin_id: UserId,
        community_id: CommunityId,
        total_count: u32,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            gateway_subscription_id: gateway_subscription_id.into(),
            gateway_plan_id: gateway_plan_id.into(),
            gateway_customer_id,
            admin_id,
            community_id,
            status: RecordStatus::Created,
            current_start: None,
            current_end: None,
            auth_attempts: 0,
            total_count,
            paid_count: 0,
            retry_attempts: 0,
            consecutive_failures: 0,
            webhook_events: Vec::new(),
            notifications_sent: Vec::new(),
            trial_reminders_sent: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if this record's status is in force.
    pub fn is_in_force(&self) -> bool {
        self.status.is_in_force()
    }

    /// Returns true if this record is marked live at the gateway level but
    /// its billing period already ended ("expired-but-stale").
    pub fn is_expired_stale(&self, now: Timestamp) -> bool {
        self.status.is_authoritative()
            && matches!(self.current_end, Some(end) if Self::is_plausible(end) && end.is_before(&now))
    }

    /// Returns true if the period end is missing or implausible.
    ///
    /// Such a record cannot be trusted and cannot be repaired; cleanup
    /// deletes it outright.
    pub fn has_untrusted_period_end(&self) -> bool {
        match self.current_end {
            None => true,
            Some(end) => !Self::is_plausible(end),
        }
    }

    /// Returns true if this record backs a `paid` community status: it is
    /// authoritative and its period extends beyond `now`.
    pub fn backs_paid_status(&self, now: Timestamp) -> bool {
        self.status.is_authoritative()
            && matches!(self.current_end, Some(end) if Self::is_plausible(end) && end.is_after(&now))
    }

    /// Applies a verified successful charge.
    ///
    /// Transitions the record to `Active`, bumps `paid_count`, resets the
    /// retry/failure counters, and installs a validated billing period:
    /// when the stored dates are missing or implausible they are replaced
    /// with `now` and `now + 30 days` so corrupt gateway data never
    /// propagates further.
    ///
    /// Returns the validated `(start, end)` pair that is now in effect.
    ///
    /// # Errors
    ///
    /// Returns error if the current status cannot transition to `Active`.
    pub fn apply_successful_charge(
        &mut self,
        now: Timestamp,
    ) -> Result<(Timestamp, Timestamp), DomainError> {
        self.transition_to(RecordStatus::Active)?;

        self.paid_count += 1;
        self.auth_attempts = 0;
        self.retry_attempts = 0;
        self.consecutive_failures = 0;

        let (start, end) = self.validated_period(now);
        self.current_start = Some(start);
        self.current_end = Some(end);
        self.updated_at = now;

        Ok((start, end))
    }

    /// Marks this record expired (reconciliation repair; preserves history).
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn mark_expired(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(RecordStatus::Expired)?;
        self.updated_at = now;
        Ok(())
    }

    /// Marks this record cancelled after the gateway confirmed cancellation.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(RecordStatus::Cancelled)?;
        self.updated_at = now;
        Ok(())
    }

    /// Appends a webhook event to the history.
    pub fn record_webhook_event(
        &mut self,
        event: impl Into<String>,
        payload: serde_json::Value,
        processed: bool,
        now: Timestamp,
    ) {
        self.webhook_events.push(WebhookEventEntry {
            event: event.into(),
            received_at: now,
            processed,
            payload,
        });
        self.updated_at = now;
    }

    /// Appends a sent notification to the history.
    pub fn record_notification(&mut self, kind: impl Into<String>, now: Timestamp) {
        self.notifications_sent.push(NotificationEntry {
            kind: kind.into(),
            sent_at: now,
        });
        self.updated_at = now;
    }

    /// Appends a sent trial reminder to the history.
    pub fn record_trial_reminder(&mut self, days_before_end: u32, now: Timestamp) {
        self.trial_reminders_sent.push(TrialReminderEntry {
            days_before_end,
            sent_at: now,
        });
        self.updated_at = now;
    }

    /// Returns the stored period if trustworthy, otherwise the defensive
    /// fallback of `now` / `now + 30 days`.
    fn validated_period(&self, now: Timestamp) -> (Timestamp, Timestamp) {
        let start = self.current_start.filter(|s| Self::is_plausible(*s));
        let end = self.current_end.filter(|e| Self::is_plausible(*e));

        match (start, end) {
            (Some(s), Some(e)) if e.is_after(&s) => (s, e),
            _ => (now, now.add_days(FALLBACK_PERIOD_DAYS)),
        }
    }

    fn is_plausible(ts: Timestamp) -> bool {
        ts.as_unix_secs() >= EARLIEST_PLAUSIBLE_UNIX_SECS
    }

    fn transition_to(&mut self, target: RecordStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {} to {}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

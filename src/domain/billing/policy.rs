//! Trial/suspension policy engine.
//!
//! Pure functions over `(CommunityBillingState, Timestamp)`: no clock
//! reads, no I/O, so every rule is unit-testable against literal
//! timestamps. All writes (suspend, expire, convert) happen in the
//! handlers that call this module.
//!
//! # Fail-closed, fail-open
//!
//! A grant whose flag is set but whose end date is missing cannot be
//! evaluated. The engine fails closed (no access) and reports
//! `malformed_grant`; the caller decides the policy. The status handler
//! applies the platform's documented availability-over-enforcement
//! fallback (grant access, log a warning); the scheduled sweep never
//! suspends such a community and flags it for reconciliation instead.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::{CommunityBillingState, PaymentStatus};

const SECS_PER_DAY: i64 = 86_400;

/// What currently grants the community access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    /// An authoritative paid subscription.
    Subscription,

    /// A running admin trial.
    AdminTrial,

    /// The legacy free-trial flag with a future subscription end date.
    LegacyTrial,
}

/// Outcome of evaluating a community's billing state at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the community currently has access.
    pub has_access: bool,

    /// What grants the access, when something does.
    pub source: Option<AccessSource>,

    /// Days remaining on a time-boxed grant (ceiling rule, floored at 0).
    /// `None` when fully paid or when no end date applies.
    pub days_remaining: Option<u32>,

    /// Whether the admin may still activate their one trial.
    pub trial_eligible: bool,

    /// A grant flag is set but its end date is missing; the state cannot
    /// be evaluated and should be reconciled.
    pub malformed_grant: bool,
}

/// Evaluates access, days remaining, and trial eligibility.
pub fn evaluate(billing: &CommunityBillingState, now: Timestamp) -> AccessDecision {
    let paid = billing.payment_status == PaymentStatus::Paid;
    let trial_running = billing.trial.is_running(now);
    let legacy_running = billing.legacy_free_trial_activated
        && matches!(billing.subscription_end_date, Some(end) if end.is_after(&now));

    let source = if paid {
        Some(AccessSource::Subscription)
    } else if trial_running {
        Some(AccessSource::AdminTrial)
    } else if legacy_running {
        Some(AccessSource::LegacyTrial)
    } else {
        None
    };
    let has_access = source.is_some();

    let malformed_grant = billing.trial.is_malformed()
        || (billing.legacy_free_trial_activated && billing.subscription_end_date.is_none());

    // Days remaining only matter on a time-boxed grant; a fully paid
    // community renews instead of running out.
    let days_remaining = if paid {
        None
    } else {
        billing
            .trial
            .end_date
            .or(billing.subscription_end_date)
            .map(|end| days_remaining(end, now))
    };

    let trial_eligible = !has_access && !billing.trial.has_used_trial;

    AccessDecision {
        has_access,
        source,
        days_remaining,
        trial_eligible,
        malformed_grant,
    }
}

/// Whole days from `now` until `end`: `ceil((end - now) / 1 day)`,
/// floored at 0.
///
/// An end date 5 days out reports 5, not 4; an end date one second out
/// still reports 1.
pub fn days_remaining(end: Timestamp, now: Timestamp) -> u32 {
    let secs = end.duration_since(&now).num_seconds();
    if secs <= 0 {
        return 0;
    }
    ((secs + SECS_PER_DAY - 1) / SECS_PER_DAY) as u32
}

//! Admin trial state.
//!
//! A community admin gets a single, non-repeatable trial. The block of
//! fields below lives on the community's billing state and is mutated by
//! trial activation, payment conversion, cancellation, the scheduled sweep
//! (suspension on expiry), and force-reset.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Trial grant for a community admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialInfo {
    /// Whether a trial is currently activated.
    pub activated: bool,

    /// Whether this admin has ever used their trial (non-repeatable).
    pub has_used_trial: bool,

    /// Trial start.
    pub start_date: Option<Timestamp>,

    /// Trial end.
    pub end_date: Option<Timestamp>,

    /// Whether the trial was cancelled (explicitly or by suspension).
    pub cancelled: bool,

    /// Whether the trial converted into a paid subscription.
    pub converted: bool,

    /// When the trial was first used.
    pub trial_used_at: Option<Timestamp>,

    /// When the trial was cancelled.
    pub cancelled_date: Option<Timestamp>,
}

impl TrialInfo {
    /// The never-activated initial state.
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Activates the trial for `days` days starting at `now`.
    ///
    /// Consumes the single trial grant: `has_used_trial` is set and never
    /// cleared again except by force-reset.
    pub fn activate(&mut self, now: Timestamp, days: i64) {
        self.activated = true;
        self.has_used_trial = true;
        self.start_date = Some(now);
        self.end_date = Some(now.add_days(days));
        self.cancelled = false;
        self.converted = false;
        self.trial_used_at = Some(now);
        self.cancelled_date = None;
    }

    /// Marks the trial as converted into a paid subscription.
    pub fn convert(&mut self) {
        self.activated = false;
        self.converted = true;
    }

    /// Cancels the trial (explicit cancel or suspension on expiry).
    pub fn cancel(&mut self, now: Timestamp) {
        self.activated = false;
        self.cancelled = true;
        self.cancelled_date = Some(now);
    }

    /// Resets every field to the never-activated state (force-reset only).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns true if the trial is activated and its end date is in the
    /// future. A trial with a missing end date is never running (fail
    /// closed); see [`is_malformed`](Self::is_malformed).
    pub fn is_running(&self, now: Timestamp) -> bool {
        self.activated && matches!(self.end_date, Some(end) if end.is_after(&now))
    }

    /// Returns true if the trial claims to be activated but carries no end
    /// date. Such data cannot be evaluated and is flagged for
    /// reconciliation rather than suspended.
    pub fn is_malformed(&self) -> bool {
        self.activated && self.end_date.is_none()
    }
}

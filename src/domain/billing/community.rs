//! Community entity and its billing state.
//!
//! The billing state mirrors/aggregates the community's subscription
//! records for fast reads. The mirrored fields are exactly the ones that
//! drift: `subscription_id` can dangle, `payment_status` can say `paid`
//! with nothing backing it. Reconciliation repairs both.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{CommunityId, CommunitySlug, OwnedByUser, Timestamp, UserId};

use super::{RecordStatus, TrialInfo};

/// Payment status of a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Never paid, or reset by reconciliation.
    Unpaid,

    /// A subscription currently pays for this community.
    Paid,

    /// Previously paid or trialing; access has lapsed.
    Expired,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// Billing fields carried on the community entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityBillingState {
    /// Coarse payment status used for access checks.
    pub payment_status: PaymentStatus,

    /// Gateway id of the record currently considered authoritative,
    /// or `None`.
    pub subscription_id: Option<String>,

    /// Mirrored status of the authoritative record.
    pub subscription_status: Option<RecordStatus>,

    /// Mirrored period start of the authoritative record.
    pub subscription_start_date: Option<Timestamp>,

    /// Mirrored period end of the authoritative record.
    pub subscription_end_date: Option<Timestamp>,

    /// Legacy free-trial flag from before the admin trial block existed.
    /// Still honored by the access policy.
    pub legacy_free_trial_activated: bool,

    /// Admin trial state.
    pub trial: TrialInfo,
}

impl CommunityBillingState {
    /// The unpaid initial state.
    pub fn unpaid() -> Self {
        Self {
            payment_status: PaymentStatus::Unpaid,
            subscription_id: None,
            subscription_status: None,
            subscription_start_date: None,
            subscription_end_date: None,
            legacy_free_trial_activated: false,
            trial: TrialInfo::inactive(),
        }
    }

    /// Applies a verified subscription activation.
    ///
    /// Installs the record as authoritative, marks the community paid, and
    /// converts any running trial. The caller passes the *validated* period
    /// (see `SubscriptionRecord::apply_successful_charge`) so corrupt dates
    /// never land here.
    ///
    /// Returns true if a trial was converted.
    pub fn apply_activation(
        &mut self,
        gateway_subscription_id: impl Into<String>,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> bool {
        self.subscription_id = Some(gateway_subscription_id.into());
        self.subscription_status = Some(RecordStatus::Active);
        self.payment_status = PaymentStatus::Paid;
        self.subscription_start_date = Some(period_start);
        self.subscription_end_date = Some(period_end);

        let converting = self.trial.activated;
        if converting {
            self.trial.convert();
        }
        converting
    }

    /// Applies a gateway-confirmed cancellation.
    ///
    /// With `at_cycle_end` the community stays paid until the period runs
    /// out (the sweep or cleanup will expire it); an immediate cancel drops
    /// access and the authoritative reference right away.
    pub fn apply_cancellation(&mut self, at_cycle_end: bool) {
        self.subscription_status = Some(RecordStatus::Cancelled);
        if !at_cycle_end {
            self.payment_status = PaymentStatus::Expired;
            self.subscription_id = None;
        }
    }

    /// Resets every subscription field and the trial block to the initial
    /// state. Force-reset only.
    pub fn reset_all(&mut self) {
        *self = Self::unpaid();
    }
}

impl Default for CommunityBillingState {
    fn default() -> Self {
        Self::unpaid()
    }
}

/// A community on the platform (billing-relevant fields only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Unique identifier.
    pub id: CommunityId,

    /// URL-facing slug.
    pub slug: CommunitySlug,

    /// The community admin; the only user allowed to run billing
    /// operations against this community.
    pub admin_id: UserId,

    /// Admin contact address for billing notifications.
    pub admin_email: String,

    /// Billing state.
    pub billing: CommunityBillingState,

    /// When the community was created.
    pub created_at: Timestamp,
}

impl Community {
    /// Creates a new community with unpaid billing state.
    pub fn new(
        slug: CommunitySlug,
        admin_id: UserId,
        admin_email: impl Into<String>,
    ) -> Self {
        Self {
            id: CommunityId::new(),
            slug,
            admin_id,
            admin_email: admin_email.into(),
            billing: CommunityBillingState::unpaid(),
            created_at: Timestamp::now(),
        }
    }
}

impl OwnedByUser for Community {
    fn owner_id(&self) -> &UserId {
        &self.admin_id
    }
}

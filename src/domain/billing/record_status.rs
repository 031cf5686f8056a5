//! Subscription record status state machine.
//!
//! Mirrors the gateway's subscription lifecycle plus the two local statuses
//! (`Trial`, `PastDue`) the platform layers on top of it.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a gateway subscription record.
///
/// `Created` through `Expired` follow the gateway's own lifecycle;
/// `Trial` and `PastDue` are platform-local statuses that still count as
/// "in force" for conflict purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Subscription initiated at the gateway, no mandate yet.
    Created,

    /// Payment mandate authenticated, awaiting first charge.
    Authenticated,

    /// Charged and current.
    Active,

    /// Platform-local trial grant backed by this record.
    Trial,

    /// A charge is pending at the gateway.
    Pending,

    /// Payment failed but the subscription is in its grace period.
    PastDue,

    /// Gateway halted charging after repeated failures.
    Halted,

    /// Explicitly cancelled (immediately or at cycle end).
    Cancelled,

    /// All planned charges were collected.
    Completed,

    /// Past its end date with no renewal.
    Expired,
}

impl RecordStatus {
    /// Returns true if this status is still "live" for conflict purposes.
    ///
    /// A community must have at most one in-force record at a time; the
    /// reconciliation service repairs violations of that invariant.
    pub fn is_in_force(&self) -> bool {
        matches!(
            self,
            RecordStatus::Active
                | RecordStatus::Trial
                | RecordStatus::PastDue
                | RecordStatus::Authenticated
                | RecordStatus::Created
        )
    }

    /// Returns true if a record in this status can back a community's
    /// `subscription_id` reference and a `paid` payment status.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, RecordStatus::Active | RecordStatus::Authenticated)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Created => "created",
            RecordStatus::Authenticated => "authenticated",
            RecordStatus::Active => "active",
            RecordStatus::Trial => "trial",
            RecordStatus::Pending => "pending",
            RecordStatus::PastDue => "past_due",
            RecordStatus::Halted => "halted",
            RecordStatus::Cancelled => "cancelled",
            RecordStatus::Completed => "completed",
            RecordStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

impl StateMachine for RecordStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use RecordStatus::*;
        matches!(
            (self, target),
            // From CREATED
            (Created, Authenticated)
                | (Created, Active) // first charge can arrive before the auth webhook
                | (Created, Pending)
                | (Created, Cancelled)
                | (Created, Expired)
            // From AUTHENTICATED
                | (Authenticated, Active)
                | (Authenticated, Pending)
                | (Authenticated, Cancelled)
                | (Authenticated, Expired)
            // From ACTIVE
                | (Active, Active) // renewal
                | (Active, Pending)
                | (Active, PastDue)
                | (Active, Halted)
                | (Active, Cancelled)
                | (Active, Completed)
                | (Active, Expired)
            // From TRIAL
                | (Trial, Active)
                | (Trial, Cancelled)
                | (Trial, Expired)
            // From PENDING
                | (Pending, Active)
                | (Pending, Halted)
                | (Pending, Cancelled)
                | (Pending, Expired)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Cancelled)
                | (PastDue, Expired)
            // From HALTED
                | (Halted, Active)
                | (Halted, Cancelled)
                | (Halted, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RecordStatus::*;
        match self {
            Created => vec![Authenticated, Active, Pending, Cancelled, Expired],
            Authenticated => vec![Active, Pending, Cancelled, Expired],
            Active => vec![Active, Pending, PastDue, Halted, Cancelled, Completed, Expired],
            Trial => vec![Active, Cancelled, Expired],
            Pending => vec![Active, Halted, Cancelled, Expired],
            PastDue => vec![Active, Cancelled, Expired],
            Halted => vec![Active, Cancelled, Expired],
            Cancelled => vec![],
            Completed => vec![],
            Expired => vec![],
        }
    }
}

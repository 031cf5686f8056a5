//! Billing domain: subscription records, community billing state, the
//! trial/suspension policy engine, and conflict analysis.

mod community;
mod conflicts;
mod errors;
pub mod policy;
mod record;
mod record_status;
mod signature;
mod transaction;
mod trial;

pub use community::{Community, CommunityBillingState, PaymentStatus};
pub use conflicts::{CleanupPlan, ConflictAnalysis};
pub use errors::BillingError;
pub use policy::{AccessDecision, AccessSource};
pub use record::{
    NotificationEntry, SubscriptionRecord, TrialReminderEntry, WebhookEventEntry,
    EARLIEST_PLAUSIBLE_UNIX_SECS, FALLBACK_PERIOD_DAYS,
};
pub use record_status::RecordStatus;
pub use signature::PaymentSignatureVerifier;
pub use transaction::{BillingTransaction, TransactionStatus};
pub use trial::TrialInfo;

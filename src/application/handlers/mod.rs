//! Command handlers.
//!
//! One handler per operation this core exposes. Handlers own the I/O
//! sequencing (lookups, authorization, persistence, gateway calls) and
//! delegate every decision to the pure domain modules so the scheduled
//! sweep and the caller-facing operations share one logic path.

mod activate_trial;
mod analyze_conflicts;
mod cancel_subscription;
mod get_community_status;
mod resolve_conflicts;
mod run_scheduled_sweep;
mod start_subscription;
mod verify_and_activate;

pub use activate_trial::{ActivateTrialCommand, ActivateTrialHandler, ActivateTrialResult};
pub use analyze_conflicts::{
    AnalyzeConflictsCommand, AnalyzeConflictsHandler, AnalyzeConflictsResult,
};
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use get_community_status::{
    AdminStatusView, GetCommunityStatusCommand, GetCommunityStatusHandler, StatusSnapshot,
};
pub use resolve_conflicts::{
    ResolutionAction, ResolveConflictsCommand, ResolveConflictsHandler, ResolveConflictsResult,
};
pub use run_scheduled_sweep::{RunScheduledSweepHandler, SweepResult};
pub use start_subscription::{
    StartSubscriptionCommand, StartSubscriptionHandler, StartSubscriptionResult,
};
pub use verify_and_activate::{
    VerifyAndActivateCommand, VerifyAndActivateHandler, VerifyAndActivateResult,
};

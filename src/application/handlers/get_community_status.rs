//! GetCommunityStatusHandler - Read-only billing status snapshot.
//!
//! Public callers get the access decision; the community admin
//! additionally gets the raw billing fields and a live conflict summary.
//!
//! This is the one place the platform's availability-over-enforcement
//! fallback lives: when grant data is malformed (a trial flag without an
//! end date), the snapshot grants access anyway and flags the community
//! for reconciliation, instead of suspending a paying customer over
//! corrupt data.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::billing::{
    policy, AccessDecision, BillingError, ConflictAnalysis, PaymentStatus, RecordStatus,
    TrialInfo,
};
use crate::domain::foundation::{CommunitySlug, OwnedByUser, Timestamp, UserId};
use crate::ports::{CommunityStore, SubscriptionRecordStore};

/// Command to fetch a community's billing status.
#[derive(Debug, Clone)]
pub struct GetCommunityStatusCommand {
    pub community_slug: CommunitySlug,

    /// The caller, when authenticated. Admin callers get richer fields.
    pub caller: Option<UserId>,
}

/// Admin-only portion of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStatusView {
    pub subscription_id: Option<String>,
    pub subscription_status: Option<RecordStatus>,
    pub subscription_start_date: Option<Timestamp>,
    pub subscription_end_date: Option<Timestamp>,
    pub trial: TrialInfo,

    /// Live conflict analysis; `None` when the record store could not be
    /// read (the snapshot itself still succeeds).
    pub conflicts: Option<ConflictAnalysis>,
}

/// Billing status snapshot for one community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub community_slug: CommunitySlug,
    pub payment_status: PaymentStatus,

    /// Whether the community currently has access (subscription or trial),
    /// after the fail-open fallback below.
    pub has_active_trial_or_payment: bool,

    /// Days remaining on a time-boxed grant.
    pub days_remaining: Option<u32>,

    /// Whether the admin may still activate their one trial.
    pub trial_eligible: bool,

    /// Grant data was malformed; access was granted by the documented
    /// fail-open fallback and the community should be reconciled.
    pub needs_reconciliation: bool,

    /// Present only when the caller is the community admin.
    pub admin: Option<AdminStatusView>,
}

/// Handler for the status snapshot.
pub struct GetCommunityStatusHandler {
    communities: Arc<dyn CommunityStore>,
    subscriptions: Arc<dyn SubscriptionRecordStore>,
}

impl GetCommunityStatusHandler {
    pub fn new(
        communities: Arc<dyn CommunityStore>,
        subscriptions: Arc<dyn SubscriptionRecordStore>,
    ) -> Self {
        Self {
            communities,
            subscriptions,
        }
    }

    pub async fn handle(
        &self,
        cmd: GetCommunityStatusCommand,
    ) -> Result<StatusSnapshot, BillingError> {
        // 1. Find the community
        let community = self
            .communities
            .find_by_slug(&cmd.community_slug)
            .await?
            .ok_or_else(|| BillingError::community_not_found(cmd.community_slug.to_string()))?;

        // 2. Evaluate the pure policy
        let now = Timestamp::now();
        let decision: AccessDecision = policy::evaluate(&community.billing, now);

        // 3. Fail open on malformed grant data: availability over strict
        //    billing enforcement, by explicit product decision.
        let has_access = if decision.malformed_grant && !decision.has_access {
            warn!(
                community = %community.slug,
                "malformed grant data; granting access and flagging for reconciliation"
            );
            true
        } else {
            decision.has_access
        };

        // 4. Admin enrichment
        let admin = match &cmd.caller {
            Some(caller) if community.is_owner(caller) => {
                let conflicts = match self
                    .subscriptions
                    .find_reconciliation_candidates(&community.id, &community.admin_id)
                    .await
                {
                    Ok(records) => Some(ConflictAnalysis::run(&community, &records, now)),
                    Err(e) => {
                        // Enrichment failure must not take down the snapshot.
                        warn!(community = %community.slug, error = %e, "conflict summary unavailable");
                        None
                    }
                };
                Some(AdminStatusView {
                    subscription_id: community.billing.subscription_id.clone(),
                    subscription_status: community.billing.subscription_status,
                    subscription_start_date: community.billing.subscription_start_date,
                    subscription_end_date: community.billing.subscription_end_date,
                    trial: community.billing.trial.clone(),
                    conflicts,
                })
            }
            _ => None,
        };

        Ok(StatusSnapshot {
            community_slug: community.slug.clone(),
            payment_status: community.billing.payment_status,
            has_active_trial_or_payment: has_access,
            days_remaining: decision.days_remaining,
            trial_eligible: decision.trial_eligible,
            needs_reconciliation: decision.malformed_grant,
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryCommunityStore, InMemorySubscriptionStore};
    use crate::domain::billing::Community;

    fn now() -> Timestamp {
        Timestamp::now()
    }

    fn admin() -> UserId {
        UserId::new("admin-1").unwrap()
    }

    fn slug() -> CommunitySlug {
        CommunitySlug::new("makers").unwrap()
    }

    fn community() -> Community {
        Community::new(slug(), admin(), "a@example.com")
    }

    async fn handler_for(community: Community) -> GetCommunityStatusHandler {
        let communities = Arc::new(InMemoryCommunityStore::with_community(community).await);
        let subscriptions = Arc::new(InMemorySubscriptionStore::new());
        GetCommunityStatusHandler::new(communities, subscriptions)
    }

    fn cmd(caller: Option<UserId>) -> GetCommunityStatusCommand {
        GetCommunityStatusCommand {
            community_slug: slug(),
            caller,
        }
    }

    #[tokio::test]
    async fn trial_community_reports_days_remaining_with_ceiling() {
        // Spec example: trial ends in exactly 5 days -> 5, not 4 or 6.
        let mut c = community();
        c.billing.trial.activate(now().minus_days(9), 14);
        let handler = handler_for(c).await;

        let snapshot = handler.handle(cmd(None)).await.unwrap();

        assert!(snapshot.has_active_trial_or_payment);
        assert_eq!(snapshot.days_remaining, Some(5));
        assert!(!snapshot.needs_reconciliation);
    }

    #[tokio::test]
    async fn anonymous_caller_gets_no_admin_view() {
        let handler = handler_for(community()).await;

        let snapshot = handler.handle(cmd(None)).await.unwrap();

        assert!(snapshot.admin.is_none());
        assert!(!snapshot.has_active_trial_or_payment);
        assert!(snapshot.trial_eligible);
    }

    #[tokio::test]
    async fn non_admin_caller_gets_no_admin_view() {
        let handler = handler_for(community()).await;

        let snapshot = handler
            .handle(cmd(Some(UserId::new("member-2").unwrap())))
            .await
            .unwrap();

        assert!(snapshot.admin.is_none());
    }

    #[tokio::test]
    async fn admin_caller_gets_billing_fields_and_conflicts() {
        let mut c = community();
        c.billing.subscription_id = Some("sub_gone".to_string());
        let handler = handler_for(c).await;

        let snapshot = handler.handle(cmd(Some(admin()))).await.unwrap();

        let view = snapshot.admin.expect("admin view");
        assert_eq!(view.subscription_id, Some("sub_gone".to_string()));
        let conflicts = view.conflicts.expect("conflict summary");
        assert_eq!(conflicts.orphaned_reference, Some("sub_gone".to_string()));
    }

    #[tokio::test]
    async fn malformed_trial_fails_open_and_flags_reconciliation() {
        let mut c = community();
        c.billing.trial.activated = true;
        c.billing.trial.has_used_trial = true;
        // No end date: unevaluable grant.
        let handler = handler_for(c).await;

        let snapshot = handler.handle(cmd(None)).await.unwrap();

        assert!(snapshot.has_active_trial_or_payment);
        assert!(snapshot.needs_reconciliation);
    }

    #[tokio::test]
    async fn unknown_community_fails_with_not_found() {
        let handler = handler_for(community()).await;

        let result = handler
            .handle(GetCommunityStatusCommand {
                community_slug: CommunitySlug::new("ghosts").unwrap(),
                caller: None,
            })
            .await;

        assert!(matches!(result, Err(BillingError::CommunityNotFound(_))));
    }
}

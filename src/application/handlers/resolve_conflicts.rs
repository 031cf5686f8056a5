//! ResolveConflictsHandler - Repairs subscription drift for one community.
//!
//! Two policies, both idempotent:
//!
//! - `cleanup` expires stale records, deletes records with untrusted
//!   dates, clears a dangling authoritative reference, and resets an
//!   unbacked `paid` status. The community is persisted only when a field
//!   actually changed.
//! - `force-reset` deletes every in-force record and resets all billing
//!   fields (including the trial block) to their initial state. Last
//!   resort, always persists.
//!
//! A single record's store failure never aborts the rest of the batch;
//! failures are accumulated and reported alongside the counts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::billing::{
    BillingError, CleanupPlan, Community, PaymentStatus, SubscriptionRecord,
};
use crate::domain::foundation::{CommunitySlug, OwnedByUser, Timestamp, UserId};
use crate::ports::{CommunityStore, SubscriptionRecordStore};

/// Which repair policy to apply.
///
/// There is deliberately no default: destructive repair requires the
/// caller to have chosen one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionAction {
    /// Minimally-destructive repair.
    Cleanup,

    /// Delete every in-force record and reset all billing state.
    ForceReset,
}

/// Command to resolve a community's subscription conflicts.
#[derive(Debug, Clone)]
pub struct ResolveConflictsCommand {
    pub community_slug: CommunitySlug,
    pub caller: UserId,
    pub action: ResolutionAction,
}

/// Result of a resolve operation.
#[derive(Debug, Clone, Default)]
pub struct ResolveConflictsResult {
    /// Records deleted from the store.
    pub removed_subscriptions: u32,

    /// Records flipped to `expired` (cleanup only).
    pub expired_subscriptions: u32,

    /// Community fields that were changed and persisted.
    pub updated_community_fields: Vec<String>,

    /// Per-record or community persistence failures; partial failure is
    /// reported, not fatal.
    pub errors: Vec<String>,
}

/// Handler for conflict resolution.
pub struct ResolveConflictsHandler {
    communities: Arc<dyn CommunityStore>,
    subscriptions: Arc<dyn SubscriptionRecordStore>,
}

impl ResolveConflictsHandler {
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
        cmd: ResolveConflictsCommand,
    ) -> Result<ResolveConflictsResult, BillingError> {
        // 1. Find the community
        let community = self
            .communities
            .find_by_slug(&cmd.community_slug)
            .await?
            .ok_or_else(|| BillingError::community_not_found(cmd.community_slug.to_string()))?;

        // 2. Authorize before touching any state
        community
            .check_ownership(&cmd.caller)
            .map_err(|_| BillingError::forbidden(cmd.community_slug.to_string()))?;

        // 3. Fetch candidates
        let records = self
            .subscriptions
            .find_reconciliation_candidates(&community.id, &community.admin_id)
            .await?;

        // 4. Apply the chosen policy
        match cmd.action {
            ResolutionAction::Cleanup => self.cleanup(community, records).await,
            ResolutionAction::ForceReset => self.force_reset(community, records).await,
        }
    }

    async fn cleanup(
        &self,
        mut community: Community,
        records: Vec<SubscriptionRecord>,
    ) -> Result<ResolveConflictsResult, BillingError> {
        let now = Timestamp::now();
        let plan = CleanupPlan::build(&community, &records, now);
        let mut result = ResolveConflictsResult::default();

        // Expire stale in-force records; keep them (history is preserved).
        for id in &plan.expire {
            let Some(mut record) = records
                .iter()
                .find(|r| &r.gateway_subscription_id == id)
                .cloned()
            else {
                continue;
            };
            let outcome = match record.mark_expired(now) {
                Ok(()) => self
                    .subscriptions
                    .update(&record)
                    .await
                    .map_err(BillingError::from),
                Err(e) => Err(BillingError::from(e)),
            };
            match outcome {
                Ok(()) => result.expired_subscriptions += 1,
                Err(e) => result.errors.push(format!("expire {}: {}", id, e)),
            }
        }

        // Delete records whose dates cannot be trusted.
        for id in &plan.delete {
            match self.subscriptions.delete_by_gateway_id(id).await {
                Ok(()) => result.removed_subscriptions += 1,
                Err(e) => result.errors.push(format!("delete {}: {}", id, e)),
            }
        }

        // Community field repairs; persist only if something changed.
        if plan.clear_subscription_id {
            community.billing.subscription_id = None;
            result
                .updated_community_fields
                .push("subscription_id".to_string());
        }
        if plan.reset_payment_status {
            community.billing.payment_status = PaymentStatus::Unpaid;
            result
                .updated_community_fields
                .push("payment_status".to_string());
        }
        if !result.updated_community_fields.is_empty() {
            if let Err(e) = self.communities.update(&community).await {
                result
                    .errors
                    .push(format!("persist community: {}", e));
                result.updated_community_fields.clear();
            }
        }

        info!(
            community = %community.slug,
            expired = result.expired_subscriptions,
            removed = result.removed_subscriptions,
            errors = result.errors.len(),
            "cleanup completed"
        );
        Ok(result)
    }

    async fn force_reset(
        &self,
        mut community: Community,
        records: Vec<SubscriptionRecord>,
    ) -> Result<ResolveConflictsResult, BillingError> {
        let mut result = ResolveConflictsResult::default();

        // Delete every in-force record for this community/admin.
        for record in records.iter().filter(|r| r.is_in_force()) {
            let id = &record.gateway_subscription_id;
            match self.subscriptions.delete_by_gateway_id(id).await {
                Ok(()) => result.removed_subscriptions += 1,
                Err(e) => result.errors.push(format!("delete {}: {}", id, e)),
            }
        }

        // Full overwrite of the billing fields, trial included.
        community.billing.reset_all();
        result.updated_community_fields = vec![
            "payment_status".to_string(),
            "subscription_id".to_string(),
            "subscription_status".to_string(),
            "subscription_start_date".to_string(),
            "subscription_end_date".to_string(),
            "trial".to_string(),
        ];
        self.communities.update(&community).await?;

        warn!(
            community = %community.slug,
            removed = result.removed_subscriptions,
            "force-reset applied"
        );
        Ok(result)
    }
}

//! AnalyzeConflictsHandler - Read-only drift analysis for one community.

use std::sync::Arc;

use crate::domain::billing::{BillingError, ConflictAnalysis};
use crate::domain::foundation::{CommunitySlug, OwnedByUser, Timestamp, UserId};
use crate::ports::{CommunityStore, SubscriptionRecordStore};

/// Command to analyze a community's subscription conflicts.
#[derive(Debug, Clone)]
pub struct AnalyzeConflictsCommand {
    pub community_slug: CommunitySlug,
    pub caller: UserId,
}

/// Result of a conflict analysis.
#[derive(Debug, Clone)]
pub struct AnalyzeConflictsResult {
    /// The classification, including human-readable findings.
    pub analysis: ConflictAnalysis,

    /// How many candidate records were examined.
    pub records_checked: usize,
}

/// Handler for conflict analysis.
///
/// Strictly read-only; safe to call arbitrarily often. Requires the caller
/// to be the community admin.
pub struct AnalyzeConflictsHandler {
    communities: Arc<dyn CommunityStore>,
    subscriptions: Arc<dyn SubscriptionRecordStore>,
}

impl AnalyzeConflictsHandler {
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
        cmd: AnalyzeConflictsCommand,
    ) -> Result<AnalyzeConflictsResult, BillingError> {
        // 1. Find the community
        let community = self
            .communities
            .find_by_slug(&cmd.community_slug)
            .await?
            .ok_or_else(|| BillingError::community_not_found(cmd.community_slug.to_string()))?;

        // 2. Authorize: only the admin may inspect billing state
        community
            .check_ownership(&cmd.caller)
            .map_err(|_| BillingError::forbidden(cmd.community_slug.to_string()))?;

        // 3. Fetch candidates (community OR admin match, by design)
        let records = self
            .subscriptions
            .find_reconciliation_candidates(&community.id, &community.admin_id)
            .await?;

        // 4. Classify
        let analysis = ConflictAnalysis::run(&community, &records, Timestamp::now());

        Ok(AnalyzeConflictsResult {
            records_checked: records.len(),
            analysis,
        })
    }
}

//! ActivateTrialHandler - Activates the admin's single trial.

use std::sync::Arc;

use tracing::info;

use crate::config::SweepConfig;
use crate::domain::billing::{policy, BillingError};
use crate::domain::foundation::{CommunitySlug, OwnedByUser, Timestamp, UserId};
use crate::ports::CommunityStore;

/// Command to activate the admin trial for a community.
#[derive(Debug, Clone)]
pub struct ActivateTrialCommand {
    pub community_slug: CommunitySlug,
    pub caller: UserId,
}

/// Result of a successful trial activation.
#[derive(Debug, Clone)]
pub struct ActivateTrialResult {
    pub trial_end: Timestamp,
    pub trial_days: i64,
}

/// Handler for trial activation.
///
/// The trial is single and non-repeatable; eligibility is decided by the
/// same policy engine the status snapshot uses.
pub struct ActivateTrialHandler {
    communities: Arc<dyn CommunityStore>,
    config: SweepConfig,
}

impl ActivateTrialHandler {
    pub fn new(communities: Arc<dyn CommunityStore>, config: SweepConfig) -> Self {
        Self {
            communities,
            config,
        }
    }

    pub async fn handle(
        &self,
        cmd: ActivateTrialCommand,
    ) -> Result<ActivateTrialResult, BillingError> {
        // 1. Find the community
        let mut community = self
            .communities
            .find_by_slug(&cmd.community_slug)
            .await?
            .ok_or_else(|| BillingError::community_not_found(cmd.community_slug.to_string()))?;

        // 2. Authorize
        community
            .check_ownership(&cmd.caller)
            .map_err(|_| BillingError::forbidden(cmd.community_slug.to_string()))?;

        // 3. Check eligibility
        let now = Timestamp::now();
        let decision = policy::evaluate(&community.billing, now);
        if !decision.trial_eligible {
            if community.billing.trial.has_used_trial {
                return Err(BillingError::TrialAlreadyUsed);
            }
            return Err(BillingError::invalid_state(
                community.billing.payment_status.to_string(),
                "activate a trial while the community already has access",
            ));
        }

        // 4. Activate and persist
        community.billing.trial.activate(now, self.config.trial_days);
        self.communities.update(&community).await?;

        let trial_end = community
            .billing
            .trial
            .end_date
            .expect("just activated");

        info!(
            community = %cmd.community_slug,
            days = self.config.trial_days,
            "trial activated"
        );
        Ok(ActivateTrialResult {
            trial_end,
            trial_days: self.config.trial_days,
        })
    }
}

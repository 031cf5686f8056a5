//! CancelSubscriptionHandler - Admin-initiated subscription cancellation.
//!
//! The gateway call comes first: local state is only flipped to
//! `cancelled` after the gateway confirms. A failed outbound call leaves
//! record and community exactly as they were.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::BillingError;
use crate::domain::foundation::{CommunitySlug, OwnedByUser, Timestamp, UserId};
use crate::ports::{CommunityStore, GatewayClient, SubscriptionRecordStore};

/// Command to cancel a community's subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub community_slug: CommunitySlug,
    pub caller: UserId,

    /// Cancel at the end of the current billing cycle (access continues
    /// until then) instead of immediately.
    pub cancel_at_cycle_end: bool,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub gateway_subscription_id: String,

    /// When access ends: the period end for cycle-end cancels, `None`
    /// (immediately) otherwise.
    pub access_until: Option<Timestamp>,
}

/// Handler for subscription cancellation.
pub struct CancelSubscriptionHandler {
    communities: Arc<dyn CommunityStore>,
    subscriptions: Arc<dyn SubscriptionRecordStore>,
    gateway: Arc<dyn GatewayClient>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        communities: Arc<dyn CommunityStore>,
        subscriptions: Arc<dyn SubscriptionRecordStore>,
        gateway: Arc<dyn GatewayClient>,
    ) -> Self {
        Self {
            communities,
            subscriptions,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
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

        // 3. Resolve the authoritative subscription
        let subscription_id = community
            .billing
            .subscription_id
            .clone()
            .ok_or_else(|| BillingError::no_active_subscription(cmd.community_slug.to_string()))?;
        let mut record = self
            .subscriptions
            .find_by_gateway_id(&subscription_id)
            .await?
            .ok_or_else(|| BillingError::subscription_not_found(subscription_id.clone()))?;

        // 4. Gateway first; local state is untouched on failure
        self.gateway
            .cancel_subscription(&subscription_id, cmd.cancel_at_cycle_end)
            .await?;

        // 5. Flip local state now that the gateway confirmed
        let now = Timestamp::now();
        record.cancel(now).map_err(|e| {
            BillingError::invalid_state(record.status.to_string(), e.to_string())
        })?;
        self.subscriptions.update(&record).await?;

        community.billing.apply_cancellation(cmd.cancel_at_cycle_end);
        self.communities.update(&community).await?;

        let access_until = if cmd.cancel_at_cycle_end {
            record.current_end
        } else {
            None
        };

        info!(
            community = %cmd.community_slug,
            subscription = %subscription_id,
            at_cycle_end = cmd.cancel_at_cycle_end,
            "subscription cancelled"
        );
        Ok(CancelSubscriptionResult {
            gateway_subscription_id: subscription_id,
            access_until,
        })
    }
}

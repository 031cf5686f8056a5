//! StartSubscriptionHandler - Subscription initiation.
//!
//! Creates the subscription at the gateway first and only then inserts
//! the local record (status `created`); a failed gateway call leaves
//! nothing behind locally. The community's authoritative reference is not
//! set here - that happens at activation, once the record is actually
//! worth pointing at.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::{BillingError, RecordStatus, SubscriptionRecord};
use crate::domain::foundation::{CommunitySlug, OwnedByUser, Timestamp, UserId};
use crate::ports::{CommunityStore, CreateSubscriptionRequest, GatewayClient, SubscriptionRecordStore};

/// Command to initiate a subscription for a community.
#[derive(Debug, Clone)]
pub struct StartSubscriptionCommand {
    pub community_slug: CommunitySlug,
    pub caller: UserId,

    /// Gateway plan to subscribe to.
    pub plan_id: String,

    /// Total number of charges (0 = open-ended).
    pub total_count: u32,

    /// Existing gateway customer id, if any.
    pub customer_id: Option<String>,
}

/// Result of a successful initiation.
#[derive(Debug, Clone)]
pub struct StartSubscriptionResult {
    pub gateway_subscription_id: String,
    pub status: RecordStatus,
}

/// Handler for subscription initiation.
pub struct StartSubscriptionHandler {
    communities: Arc<dyn CommunityStore>,
    subscriptions: Arc<dyn SubscriptionRecordStore>,
    gateway: Arc<dyn GatewayClient>,
}

impl StartSubscriptionHandler {
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
        cmd: StartSubscriptionCommand,
    ) -> Result<StartSubscriptionResult, BillingError> {
        // 1. Find the community
        let community = self
            .communities
            .find_by_slug(&cmd.community_slug)
            .await?
            .ok_or_else(|| BillingError::community_not_found(cmd.community_slug.to_string()))?;

        // 2. Authorize
        community
            .check_ownership(&cmd.caller)
            .map_err(|_| BillingError::forbidden(cmd.community_slug.to_string()))?;

        // 3. Enforce at-most-one in-force subscription up front
        let existing = self
            .subscriptions
            .find_reconciliation_candidates(&community.id, &community.admin_id)
            .await?;
        if let Some(in_force) = existing.iter().find(|r| r.is_in_force()) {
            return Err(BillingError::invalid_state(
                in_force.status.to_string(),
                format!(
                    "start a new subscription while {} is in force",
                    in_force.gateway_subscription_id
                ),
            ));
        }

        // 4. Create at the gateway; nothing local exists yet on failure
        let subscription = self
            .gateway
            .create_subscription(CreateSubscriptionRequest {
                plan_id: cmd.plan_id.clone(),
                customer_id: cmd.customer_id.clone(),
                total_count: cmd.total_count,
            })
            .await?;

        // 5. Mirror it locally with status `created`
        let mut record = SubscriptionRecord::new(
            &subscription.id,
            &subscription.plan_id,
            subscription.customer_id.clone(),
            community.admin_id.clone(),
            community.id,
            subscription.total_count,
        );
        record.current_start = subscription
            .current_start
            .filter(|s| *s > 0)
            .map(|s| Timestamp::from_unix_secs(s as u64));
        record.current_end = subscription
            .current_end
            .filter(|e| *e > 0)
            .map(|e| Timestamp::from_unix_secs(e as u64));
        self.subscriptions.insert(&record).await?;

        info!(
            community = %cmd.community_slug,
            subscription = %subscription.id,
            plan = %cmd.plan_id,
            "subscription initiated"
        );
        Ok(StartSubscriptionResult {
            gateway_subscription_id: subscription.id,
            status: record.status,
        })
    }
}

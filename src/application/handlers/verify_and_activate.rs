//! VerifyAndActivateHandler - State transition on verified payment success.
//!
//! The lookup is scoped to the admin (gateway id + admin id) so a forged
//! or foreign subscription id can never activate someone else's
//! community, and the signature check runs before any state is written:
//! a bad signature fails the whole operation with nothing persisted.

use std::sync::Arc;

use tracing::warn;

use crate::domain::billing::{BillingError, BillingTransaction};
use crate::domain::foundation::{CommunityId, Timestamp, UserId};
use crate::ports::{CommunityStore, GatewayClient, SubscriptionRecordStore, TransactionLog};

/// Command to verify a payment confirmation and activate the subscription.
#[derive(Debug, Clone)]
pub struct VerifyAndActivateCommand {
    /// Gateway subscription id from the payment confirmation.
    pub gateway_subscription_id: String,

    /// Gateway payment id from the payment confirmation.
    pub gateway_payment_id: String,

    /// Signature over the payment/subscription pair.
    pub signature: String,

    /// The admin the confirmation claims to belong to.
    pub admin_id: UserId,

    /// Optional explicit community; defaults to the record's community.
    pub community_id: Option<CommunityId>,
}

/// Result of a successful activation.
#[derive(Debug, Clone)]
pub struct VerifyAndActivateResult {
    pub gateway_subscription_id: String,

    /// Validated billing period now in effect.
    pub period_start: Timestamp,
    pub period_end: Timestamp,

    /// Whether a running trial was converted by this activation.
    pub trial_converted: bool,

    /// Whether the audit transaction could be recorded.
    pub transaction_recorded: bool,
}

/// Handler for payment verification and subscription activation.
pub struct VerifyAndActivateHandler {
    communities: Arc<dyn CommunityStore>,
    subscriptions: Arc<dyn SubscriptionRecordStore>,
    gateway: Arc<dyn GatewayClient>,
    transactions: Arc<dyn TransactionLog>,
}

impl VerifyAndActivateHandler {
    pub fn new(
        communities: Arc<dyn CommunityStore>,
        subscriptions: Arc<dyn SubscriptionRecordStore>,
        gateway: Arc<dyn GatewayClient>,
        transactions: Arc<dyn TransactionLog>,
    ) -> Self {
        Self {
            communities,
            subscriptions,
            gateway,
            transactions,
        }
    }

    pub async fn handle(
        &self,
        cmd: VerifyAndActivateCommand,
    ) -> Result<VerifyAndActivateResult, BillingError> {
        // 1. Find the record, scoped to the claimed admin (anti-replay)
        let mut record = self
            .subscriptions
            .find_for_admin(&cmd.gateway_subscription_id, &cmd.admin_id)
            .await?
            .ok_or_else(|| {
                BillingError::subscription_not_found(cmd.gateway_subscription_id.clone())
            })?;

        // 2. Find the community before mutating anything
        let community_id = cmd.community_id.unwrap_or(record.community_id);
        let mut community = self
            .communities
            .find_by_id(&community_id)
            .await?
            .ok_or_else(|| BillingError::community_not_found(community_id.to_string()))?;

        // 3. Verify the signature; failure aborts with nothing written
        let verified = self
            .gateway
            .verify_signature(
                &cmd.gateway_subscription_id,
                &cmd.gateway_payment_id,
                &cmd.signature,
            )
            .await?;
        if !verified && !Self::signature_bypass_allowed() {
            return Err(BillingError::signature_verification_failed());
        }

        // 4. Apply the charge: status -> active, counters reset, period
        //    validated (corrupt dates replaced with now / now + 30 days)
        let now = Timestamp::now();
        let (period_start, period_end) = record.apply_successful_charge(now).map_err(|e| {
            BillingError::invalid_state(record.status.to_string(), e.to_string())
        })?;
        record.record_webhook_event(
            "subscription.charged",
            serde_json::json!({
                "payment_id": cmd.gateway_payment_id,
                "signature_verified": verified,
            }),
            true,
            now,
        );
        self.subscriptions.update(&record).await?;

        // 5. Propagate into the community billing state
        let trial_converted = community.billing.apply_activation(
            &record.gateway_subscription_id,
            period_start,
            period_end,
        );
        self.communities.update(&community).await?;

        // 6. Append the audit transaction. Its failure must not unwind a
        //    completed activation; it is reported instead.
        let transaction_recorded = match self
            .gateway
            .fetch_payment_details(&cmd.gateway_payment_id)
            .await
        {
            Ok(Some(payment)) => {
                let transaction = BillingTransaction::captured(
                    community.id,
                    record.admin_id.clone(),
                    &payment.id,
                    &record.gateway_subscription_id,
                    payment.amount_minor,
                    &payment.currency,
                    now,
                );
                match self.transactions.append(&transaction).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(payment = %cmd.gateway_payment_id, error = %e, "transaction append failed");
                        false
                    }
                }
            }
            Ok(None) => {
                warn!(payment = %cmd.gateway_payment_id, "payment details not found; no transaction recorded");
                false
            }
            Err(e) => {
                warn!(payment = %cmd.gateway_payment_id, error = %e, "payment details fetch failed");
                false
            }
        };

        Ok(VerifyAndActivateResult {
            gateway_subscription_id: record.gateway_subscription_id,
            period_start,
            period_end,
            trial_converted,
            transaction_recorded,
        })
    }

    /// Whether a failed signature check may be bypassed.
    ///
    /// Only ever true in builds compiled with the
    /// `insecure-signature-bypass` feature, which no release
    /// configuration enables; a production binary does not contain this
    /// code path at all.
    fn signature_bypass_allowed() -> bool {
        #[cfg(feature = "insecure-signature-bypass")]
        {
            warn!("payment signature verification bypassed (insecure-signature-bypass build)");
            true
        }
        #[cfg(not(feature = "insecure-signature-bypass"))]
        {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryCommunityStore, InMemorySubscriptionStore, InMemoryTransactionLog, MockGateway,
    };
    use crate::domain::billing::{
        Community, PaymentStatus, RecordStatus, SubscriptionRecord, TransactionStatus,
    };
    use crate::domain::foundation::CommunitySlug;
    use crate::ports::{GatewayError, PaymentDetails};

    fn admin() -> UserId {
        UserId::new("admin-1").unwrap()
    }

    fn community() -> Community {
        Community::new(CommunitySlug::new("makers").unwrap(), admin(), "a@example.com")
    }

    fn created_record(community: &Community, id: &str) -> SubscriptionRecord {
        SubscriptionRecord::new(
            id,
            "plan_monthly",
            Some("cust_7".to_string()),
            community.admin_id.clone(),
            community.id,
            12,
        )
    }

    fn cmd(id: &str) -> VerifyAndActivateCommand {
        VerifyAndActivateCommand {
            gateway_subscription_id: id.to_string(),
            gateway_payment_id: "pay_1".to_string(),
            signature: "sig".to_string(),
            admin_id: admin(),
            community_id: None,
        }
    }

    struct Fixture {
        communities: Arc<InMemoryCommunityStore>,
        subscriptions: Arc<InMemorySubscriptionStore>,
        gateway: MockGateway,
        transactions: Arc<InMemoryTransactionLog>,
        handler: VerifyAndActivateHandler,
    }

    async fn fixture(community: Community, records: Vec<SubscriptionRecord>) -> Fixture {
        let communities = Arc::new(InMemoryCommunityStore::with_community(community).await);
        let subscriptions = Arc::new(InMemorySubscriptionStore::with_records(records).await);
        let gateway = MockGateway::new();
        let transactions = Arc::new(InMemoryTransactionLog::new());
        let handler = VerifyAndActivateHandler::new(
            communities.clone(),
            subscriptions.clone(),
            Arc::new(gateway.clone()),
            transactions.clone(),
        );
        Fixture {
            communities,
            subscriptions,
            gateway,
            transactions,
            handler,
        }
    }

    #[tokio::test]
    async fn activation_updates_record_community_and_audit_log() {
        let c = community();
        let id = c.id;
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;
        f.gateway.set_payment(PaymentDetails {
            id: "pay_1".to_string(),
            amount_minor: 4_900,
            currency: "USD".to_string(),
            status: "captured".to_string(),
        });

        let result = f.handler.handle(cmd("sub_1")).await.unwrap();

        assert!(result.transaction_recorded);

        let record = f.subscriptions.get("sub_1").await.unwrap();
        assert_eq!(record.status, RecordStatus::Active);
        assert_eq!(record.paid_count, 1);
        assert_eq!(record.webhook_events.len(), 1);
        assert_eq!(record.webhook_events[0].event, "subscription.charged");

        let stored = f.communities.get(&id).await.unwrap();
        assert_eq!(stored.billing.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.billing.subscription_id, Some("sub_1".to_string()));
        assert_eq!(stored.billing.subscription_end_date, Some(result.period_end));

        let transactions = f.transactions.list_for_community(&id).await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount_minor, 4_900);
        assert_eq!(transactions[0].status, TransactionStatus::Captured);
    }

    #[tokio::test]
    async fn activation_converts_running_trial() {
        let mut c = community();
        c.billing.trial.activate(Timestamp::now(), 14);
        let id = c.id;
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;

        let result = f.handler.handle(cmd("sub_1")).await.unwrap();

        assert!(result.trial_converted);
        let stored = f.communities.get(&id).await.unwrap();
        assert!(stored.billing.trial.converted);
        assert!(!stored.billing.trial.activated);
    }

    #[tokio::test]
    async fn forged_subscription_id_returns_not_found_and_writes_nothing() {
        let c = community();
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;

        let result = f.handler.handle(cmd("sub_forged")).await;

        assert!(matches!(result, Err(BillingError::SubscriptionNotFound(_))));
        let record = f.subscriptions.get("sub_1").await.unwrap();
        assert_eq!(record.status, RecordStatus::Created);
        assert!(f.transactions.all().await.is_empty());
    }

    #[tokio::test]
    async fn foreign_admins_subscription_returns_not_found() {
        let c = community();
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;

        let mut foreign = cmd("sub_1");
        foreign.admin_id = UserId::new("other-admin").unwrap();
        let result = f.handler.handle(foreign).await;

        assert!(matches!(result, Err(BillingError::SubscriptionNotFound(_))));
    }

    #[cfg(not(feature = "insecure-signature-bypass"))]
    #[tokio::test]
    async fn bad_signature_fails_whole_operation() {
        let c = community();
        let id = c.id;
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;
        f.gateway.reject_signatures();

        let result = f.handler.handle(cmd("sub_1")).await;

        assert!(matches!(
            result,
            Err(BillingError::SignatureVerificationFailed)
        ));
        // No partial activation.
        let record = f.subscriptions.get("sub_1").await.unwrap();
        assert_eq!(record.status, RecordStatus::Created);
        assert_eq!(record.paid_count, 0);
        let stored = f.communities.get(&id).await.unwrap();
        assert_eq!(stored.billing.payment_status, PaymentStatus::Unpaid);
    }

    #[cfg(feature = "insecure-signature-bypass")]
    #[tokio::test]
    async fn dev_bypass_build_activates_despite_bad_signature() {
        let c = community();
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;
        f.gateway.reject_signatures();

        let result = f.handler.handle(cmd("sub_1")).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn gateway_error_during_verification_aborts() {
        let c = community();
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;
        f.gateway
            .fail_method("verify_signature", GatewayError::network("down"));

        let result = f.handler.handle(cmd("sub_1")).await;

        assert!(matches!(result, Err(BillingError::Gateway(_))));
        let record = f.subscriptions.get("sub_1").await.unwrap();
        assert_eq!(record.status, RecordStatus::Created);
    }

    #[tokio::test]
    async fn corrupt_period_dates_are_replaced_not_propagated() {
        let c = community();
        let id = c.id;
        let mut record = created_record(&c, "sub_1");
        record.current_start = Some(Timestamp::from_unix_secs(0));
        record.current_end = Some(Timestamp::from_unix_secs(500));
        let f = fixture(c.clone(), vec![record]).await;

        let before = Timestamp::now();
        let result = f.handler.handle(cmd("sub_1")).await.unwrap();

        assert!(!result.period_start.is_before(&before));
        assert_eq!(result.period_end, result.period_start.add_days(30));

        let stored = f.communities.get(&id).await.unwrap();
        assert_eq!(stored.billing.subscription_start_date, Some(result.period_start));
        assert_eq!(stored.billing.subscription_end_date, Some(result.period_end));
    }

    #[tokio::test]
    async fn missing_payment_details_skips_audit_but_activates() {
        let c = community();
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;
        // No payment configured in the mock.

        let result = f.handler.handle(cmd("sub_1")).await.unwrap();

        assert!(!result.transaction_recorded);
        let record = f.subscriptions.get("sub_1").await.unwrap();
        assert_eq!(record.status, RecordStatus::Active);
    }

    #[tokio::test]
    async fn explicit_community_id_overrides_record_community() {
        let c = community();
        let other = Community::new(
            CommunitySlug::new("other").unwrap(),
            admin(),
            "b@example.com",
        );
        let other_id = other.id;
        let f = fixture(c.clone(), vec![created_record(&c, "sub_1")]).await;
        f.communities.add(other).await;

        let mut command = cmd("sub_1");
        command.community_id = Some(other_id);
        f.handler.handle(command).await.unwrap();

        let stored = f.communities.get(&other_id).await.unwrap();
        assert_eq!(stored.billing.payment_status, PaymentStatus::Paid);
    }
}

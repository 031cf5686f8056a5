//! Billing transaction audit records.
//!
//! One row per captured charge, appended when a payment is verified and
//! never mutated afterwards except for later refund bookkeeping. All
//! monetary values are minor units (cents), never floats.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CommunityId, Timestamp, TransactionId, UserId};

/// Status of a billing transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Charge captured at the gateway.
    Captured,

    /// Charge was later refunded.
    Refunded,
}

/// An audit-trail entry for one captured charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingTransaction {
    /// Unique identifier.
    pub id: TransactionId,

    /// Community the charge paid for.
    pub community_id: CommunityId,

    /// Admin who owns the subscription.
    pub admin_id: UserId,

    /// Gateway payment id.
    pub gateway_payment_id: String,

    /// Gateway subscription id the charge belongs to.
    pub gateway_subscription_id: String,

    /// Amount in minor units (cents).
    pub amount_minor: i64,

    /// ISO currency code as reported by the gateway.
    pub currency: String,

    /// Transaction status.
    pub status: TransactionStatus,

    /// When the transaction was recorded.
    pub created_at: Timestamp,
}

impl BillingTransaction {
    /// Creates a captured transaction for a verified charge.
    pub fn captured(
        community_id: CommunityId,
        admin_id: UserId,
        gateway_payment_id: impl Into<String>,
        gateway_subscription_id: impl Into<String>,
        amount_minor: i64,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            community_id,
            admin_id,
            gateway_payment_id: gateway_payment_id.into(),
            gateway_subscription_id: gateway_subscription_id.into(),
            amount_minor,
            currency: currency.into(),
            status: TransactionStatus::Captured,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_transaction_carries_charge_details() {
        let tx = BillingTransaction::captured(
            CommunityId::new(),
            UserId::new("admin-1").unwrap(),
            "pay_123",
            "sub_456",
            4_900,
            "USD",
            Timestamp::from_unix_secs(1_735_689_600),
        );

        assert_eq!(tx.status, TransactionStatus::Captured);
        assert_eq!(tx.amount_minor, 4_900);
        assert_eq!(tx.gateway_payment_id, "pay_123");
        assert_eq!(tx.gateway_subscription_id, "sub_456");
    }

    #[test]
    fn transaction_ids_are_unique() {
        let make = || {
            BillingTransaction::captured(
                CommunityId::new(),
                UserId::new("admin-1").unwrap(),
                "pay_1",
                "sub_1",
                100,
                "USD",
                Timestamp::from_unix_secs(1_735_689_600),
            )
        };

        assert_ne!(make().id, make().id);
    }
}

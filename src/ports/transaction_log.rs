//! Billing transaction log port.
//!
//! Append-only: transactions are written once when a charge is verified
//! and never mutated by this core (refund bookkeeping happens elsewhere).

use async_trait::async_trait;

use crate::domain::billing::BillingTransaction;
use crate::domain::foundation::{CommunityId, DomainError};

/// Port for the append-only billing transaction log.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Append a transaction to the log.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn append(&self, transaction: &BillingTransaction) -> Result<(), DomainError>;

    /// List transactions recorded for a community, oldest first.
    async fn list_for_community(
        &self,
        community_id: &CommunityId,
    ) -> Result<Vec<BillingTransaction>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn transaction_log_is_object_safe() {
        fn _accepts_dyn(_log: &dyn TransactionLog) {}
    }
}

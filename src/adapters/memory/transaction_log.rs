//! In-memory billing transaction log.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::BillingTransaction;
use crate::domain::foundation::{CommunityId, DomainError};
use crate::ports::TransactionLog;

/// In-memory implementation of `TransactionLog`.
#[derive(Default)]
pub struct InMemoryTransactionLog {
    transactions: RwLock<Vec<BillingTransaction>>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all appended transactions.
    pub async fn all(&self) -> Vec<BillingTransaction> {
        self.transactions.read().await.clone()
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn append(&self, transaction: &BillingTransaction) -> Result<(), DomainError> {
        self.transactions.write().await.push(transaction.clone());
        Ok(())
    }

    async fn list_for_community(
        &self,
        community_id: &CommunityId,
    ) -> Result<Vec<BillingTransaction>, DomainError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| &t.community_id == community_id)
            .cloned()
            .collect())
    }
}

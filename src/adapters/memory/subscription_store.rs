//! In-memory subscription record store.
//!
//! Backs tests and local development. Supports per-record failure
//! injection so partial-failure reporting in the reconciliation handlers
//! can be exercised.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::SubscriptionRecord;
use crate::domain::foundation::{CommunityId, DomainError, ErrorCode, UserId};
use crate::ports::SubscriptionRecordStore;

/// In-memory implementation of `SubscriptionRecordStore`.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: RwLock<HashMap<String, SubscriptionRecord>>,
    fail_update_ids: RwLock<HashSet<String>>,
    fail_delete_ids: RwLock<HashSet<String>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given records.
    pub async fn with_records(records: Vec<SubscriptionRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write().await;
            for record in records {
                map.insert(record.gateway_subscription_id.clone(), record);
            }
        }
        store
    }

    /// Makes every `update` for this gateway id fail.
    pub async fn fail_updates_for(&self, gateway_subscription_id: &str) {
        self.fail_update_ids
            .write()
            .await
            .insert(gateway_subscription_id.to_string());
    }

    /// Makes every `delete` for this gateway id fail.
    pub async fn fail_deletes_for(&self, gateway_subscription_id: &str) {
        self.fail_delete_ids
            .write()
            .await
            .insert(gateway_subscription_id.to_string());
    }

    /// Returns a snapshot of all stored records.
    pub async fn all(&self) -> Vec<SubscriptionRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Returns the stored record for a gateway id, if any.
    pub async fn get(&self, gateway_subscription_id: &str) -> Option<SubscriptionRecord> {
        self.records.read().await.get(gateway_subscription_id).cloned()
    }
}

#[async_trait]
impl SubscriptionRecordStore for InMemorySubscriptionStore {
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.gateway_subscription_id) {
            return Err(DomainError::validation(
                "gateway_subscription_id",
                format!(
                    "Record already exists: {}",
                    record.gateway_subscription_id
                ),
            ));
        }
        records.insert(record.gateway_subscription_id.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        if self
            .fail_update_ids
            .read()
            .await
            .contains(&record.gateway_subscription_id)
        {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Injected update failure for {}", record.gateway_subscription_id),
            ));
        }

        let mut records = self.records.write().await;
        match records.get_mut(&record.gateway_subscription_id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Record not found: {}", record.gateway_subscription_id),
            )),
        }
    }

    async fn find_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self.records.read().await.get(gateway_subscription_id).cloned())
    }

    async fn find_for_admin(
        &self,
        gateway_subscription_id: &str,
        admin_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .get(gateway_subscription_id)
            .filter(|r| &r.admin_id == admin_id)
            .cloned())
    }

    async fn find_reconciliation_candidates(
        &self,
        community_id: &CommunityId,
        admin_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let mut candidates: Vec<SubscriptionRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| &r.community_id == community_id || &r.admin_id == admin_id)
            .cloned()
            .collect();
        // Deterministic order for stable findings and tests.
        candidates.sort_by(|a, b| a.gateway_subscription_id.cmp(&b.gateway_subscription_id));
        Ok(candidates)
    }

    async fn delete_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<(), DomainError> {
        if self.fail_delete_ids.read().await.contains(gateway_subscription_id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Injected delete failure for {}", gateway_subscription_id),
            ));
        }

        let mut records = self.records.write().await;
        match records.remove(gateway_subscription_id) {
            Some(_) => Ok(()),
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Record not found: {}", gateway_subscription_id),
            )),
        }
    }
}

//! Subscription record store port.
//!
//! Defines the contract for persisting and retrieving `SubscriptionRecord`
//! documents. Implementations handle the actual database operations; the
//! store guarantees per-document atomicity and nothing more.

use async_trait::async_trait;

use crate::domain::billing::SubscriptionRecord;
use crate::domain::foundation::{CommunityId, DomainError, UserId};

/// Store port for subscription record persistence.
#[async_trait]
pub trait SubscriptionRecordStore: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if a record with this gateway id already exists
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    /// Update an existing record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    /// Find a record by its gateway subscription id.
    ///
    /// Returns `None` if not found.
    async fn find_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Find a record by gateway subscription id scoped to an admin.
    ///
    /// Returns `None` if no record with that id belongs to `admin_id`.
    /// Activation looks records up this way so a forged or foreign
    /// subscription id can never activate someone else's community.
    async fn find_for_admin(
        &self,
        gateway_subscription_id: &str,
        admin_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Find every record whose community id *or* admin id matches.
    ///
    /// The OR is intentional: reconciliation must also surface records
    /// that were written with the right admin but the wrong community id
    /// (or vice versa), which a single-key lookup would hide.
    async fn find_reconciliation_candidates(
        &self,
        community_id: &CommunityId,
        admin_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError>;

    /// Delete a record by its gateway subscription id.
    ///
    /// Reconciliation deletes records whose dates cannot be trusted;
    /// everything else transitions to a terminal status instead.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn delete_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<(), DomainError>;
}

//! Community store port.
//!
//! Read/write access to community entities. Billing only ever mutates the
//! billing-relevant fields; everything else about a community is owned by
//! other parts of the platform.

use async_trait::async_trait;

use crate::domain::billing::Community;
use crate::domain::foundation::{CommunityId, CommunitySlug, DomainError};

/// Store port for community persistence.
#[async_trait]
pub trait CommunityStore: Send + Sync {
    /// Find a community by its slug.
    ///
    /// Returns `None` if not found. This is the primary lookup for
    /// caller-facing operations, which address communities by slug.
    async fn find_by_slug(&self, slug: &CommunitySlug) -> Result<Option<Community>, DomainError>;

    /// Find a community by its id.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &CommunityId) -> Result<Option<Community>, DomainError>;

    /// Persist an updated community.
    ///
    /// # Errors
    ///
    /// - `CommunityNotFound` if the community doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, community: &Community) -> Result<(), DomainError>;

    /// Find every community whose admin trial is currently activated.
    ///
    /// Used by the scheduled sweep for reminders and suspensions; trials
    /// that converted or were cancelled are excluded by definition
    /// (`activated` is cleared on both).
    async fn find_with_activated_trials(&self) -> Result<Vec<Community>, DomainError>;
}

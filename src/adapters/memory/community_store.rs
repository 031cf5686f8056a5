//! In-memory community store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Community;
use crate::domain::foundation::{CommunityId, CommunitySlug, DomainError, ErrorCode};
use crate::ports::CommunityStore;

/// In-memory implementation of `CommunityStore`.
#[derive(Default)]
pub struct InMemoryCommunityStore {
    communities: RwLock<HashMap<CommunityId, Community>>,
    fail_updates: AtomicBool,
}

impl InMemoryCommunityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one community.
    pub async fn with_community(community: Community) -> Self {
        let store = Self::new();
        store
            .communities
            .write()
            .await
            .insert(community.id, community);
        store
    }

    /// Adds a community to the store.
    pub async fn add(&self, community: Community) {
        self.communities
            .write()
            .await
            .insert(community.id, community);
    }

    /// Makes every subsequent `update` fail.
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    /// Returns the stored community by id, if any.
    pub async fn get(&self, id: &CommunityId) -> Option<Community> {
        self.communities.read().await.get(id).cloned()
    }
}

#[async_trait]
impl CommunityStore for InMemoryCommunityStore {
    async fn find_by_slug(&self, slug: &CommunitySlug) -> Result<Option<Community>, DomainError> {
        Ok(self
            .communities
            .read()
            .await
            .values()
            .find(|c| &c.slug == slug)
            .cloned())
    }

    async fn find_by_id(&self, id: &CommunityId) -> Result<Option<Community>, DomainError> {
        Ok(self.communities.read().await.get(id).cloned())
    }

    async fn update(&self, community: &Community) -> Result<(), DomainError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Injected community update failure",
            ));
        }

        let mut communities = self.communities.write().await;
        match communities.get_mut(&community.id) {
            Some(existing) => {
                *existing = community.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::CommunityNotFound,
                format!("Community not found: {}", community.slug),
            )),
        }
    }

    async fn find_with_activated_trials(&self) -> Result<Vec<Community>, DomainError> {
        let mut trials: Vec<Community> = self
            .communities
            .read()
            .await
            .values()
            .filter(|c| c.billing.trial.activated)
            .cloned()
            .collect();
        trials.sort_by(|a, b| a.slug.as_str().cmp(b.slug.as_str()));
        Ok(trials)
    }
}

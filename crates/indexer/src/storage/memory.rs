//! In-memory implementation of the store contracts.
//!
//! All state is held in memory and lost on drop. Clones share the same
//! underlying maps, so a test can hand one clone to the indexer and inspect
//! another.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use netsepio_core::{AccountKey, Review, ReviewId, User};
use tokio::sync::RwLock;

use super::types::sort_by_token_id;
use super::{CursorStore, DatabaseStats, EntityStore, StoreResult, SyncState};

#[derive(Debug, Default)]
struct MemoryState {
    reviews: HashMap<ReviewId, Review>,
    users: HashMap<AccountKey, User>,
    sync_state: SyncState,
}

/// In-memory entity and cursor store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reviews.
    pub async fn review_count(&self) -> usize {
        self.state.read().await.reviews.len()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Collection statistics, shaped like [`super::Storage::stats`].
    pub async fn stats(&self) -> DatabaseStats {
        let state = self.state.read().await;
        DatabaseStats {
            review_count: state.reviews.len() as u64,
            deleted_review_count: state.reviews.values().filter(|r| r.deleted).count() as u64,
            user_count: state.users.len() as u64,
            last_block_number: state.sync_state.last_block_number,
            chain_id: state.sync_state.chain_id,
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn load_review(&self, id: &ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.state.read().await.reviews.get(id).cloned())
    }

    async fn save_review(&self, review: &Review) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.reviews.insert(review.id.clone(), review.clone());
        Ok(())
    }

    async fn reviews_by(&self, account: &AccountKey) -> StoreResult<Vec<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<_> = state
            .reviews
            .values()
            .filter(|review| review.review_by == *account)
            .cloned()
            .collect();
        sort_by_token_id(&mut reviews);
        Ok(reviews)
    }

    async fn load_user(&self, id: &AccountKey) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn get_sync_state(&self) -> StoreResult<SyncState> {
        Ok(self.state.read().await.sync_state)
    }

    async fn update_sync_state(&self, state: &SyncState) -> StoreResult<()> {
        self.state.write().await.sync_state = *state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsepio_core::Address;

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let view = store.clone();

        let user = User::create(AccountKey::from(Address::repeat_byte(0x01)));
        store.save_user(&user).await.unwrap();

        assert_eq!(view.load_user(&user.id).await.unwrap(), Some(user));
        assert_eq!(view.user_count().await, 1);
        assert_eq!(view.stats().await.user_count, 1);
    }

    #[tokio::test]
    async fn test_load_user_or_else_does_not_persist() {
        let store = MemoryStore::new();
        let id = AccountKey::from(Address::repeat_byte(0x02));

        let loaded = store
            .load_user_or_else(&id, || User::create(id))
            .await
            .unwrap();
        assert!(loaded.created);
        assert!(loaded.entity.roles.is_empty());
        assert_eq!(store.user_count().await, 0);

        store.save_user(&loaded.entity).await.unwrap();
        let again = store
            .load_user_or_else(&id, || unreachable!("user exists"))
            .await
            .unwrap();
        assert!(!again.created);
    }

    #[tokio::test]
    async fn test_cursor_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get_sync_state().await.unwrap().is_fresh());

        let state = SyncState {
            last_block_number: 9,
            updated_at: 1,
            chain_id: 137,
        };
        store.update_sync_state(&state).await.unwrap();
        assert_eq!(store.get_sync_state().await.unwrap(), state);
    }
}

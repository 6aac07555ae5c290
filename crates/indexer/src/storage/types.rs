//! Database types for the indexer storage layer.

use netsepio_core::Review;

/// Sync state record (singleton).
///
/// Tracks the indexer's progress through the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Last fully processed block number
    pub last_block_number: u64,

    /// Unix timestamp of last update
    pub updated_at: i64,

    /// Chain ID (0 until the first run pins it)
    pub chain_id: u64,
}

impl SyncState {
    /// Whether the cursor has never been initialized.
    pub fn is_fresh(&self) -> bool {
        self.chain_id == 0 && self.last_block_number == 0
    }
}

/// Result of a create-if-absent load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    /// The loaded or freshly constructed entity.
    pub entity: T,

    /// `true` when the entity came from the default factory and has not been
    /// persisted yet.
    pub created: bool,
}

impl<T> Loaded<T> {
    /// Wrap an entity read from the store.
    pub fn existing(entity: T) -> Self {
        Self {
            entity,
            created: false,
        }
    }

    /// Wrap an entity built by a default factory.
    pub fn created(entity: T) -> Self {
        Self {
            entity,
            created: true,
        }
    }
}

/// Database statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of reviews (including deleted)
    pub review_count: u64,

    /// Number of reviews carrying the deletion tombstone
    pub deleted_review_count: u64,

    /// Total number of users
    pub user_count: u64,

    /// Last processed block number
    pub last_block_number: u64,

    /// Chain the cursor is pinned to
    pub chain_id: u64,
}

/// Collection names, used in diagnostics.
pub(crate) const REVIEWS: &str = "reviews";
pub(crate) const USERS: &str = "users";

/// Sort reviews by numeric token id.
pub(crate) fn sort_by_token_id(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| {
        let (a, b) = (a.id.as_str(), b.id.as_str());
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    });
}

//! Routing of decoded events to their transition functions.

use crate::handlers;
use crate::listener::events::LedgerEvent;
use crate::storage::{EntityStore, StoreResult};

/// Why an event left the store unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The event refers to a review that was never created.
    ReviewNotFound,
    /// The account already holds the role.
    RoleAlreadyGranted,
    /// The account does not hold the role.
    RoleNotHeld,
}

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event changed entity state.
    Applied,
    /// The event had no effect on existing entities.
    Skipped(SkipReason),
}

impl Outcome {
    /// Whether the event was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// Applies decoded events to a store.
#[derive(Debug, Clone)]
pub struct Dispatcher<S> {
    store: S,
}

impl<S: EntityStore> Dispatcher<S> {
    /// Create a dispatcher writing to `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply one event. Store errors are returned as-is.
    pub async fn apply(&self, event: &LedgerEvent) -> StoreResult<Outcome> {
        match event {
            LedgerEvent::ReviewCreated(e) => handlers::review_created(&self.store, e).await,
            LedgerEvent::ReviewUpdated(e) => handlers::review_updated(&self.store, e).await,
            LedgerEvent::ReviewDeleted(e) => handlers::review_deleted(&self.store, e).await,
            LedgerEvent::RoleGranted(e) => handlers::role_granted(&self.store, e).await,
            LedgerEvent::RoleRevoked(e) => handlers::role_revoked(&self.store, e).await,
        }
    }
}

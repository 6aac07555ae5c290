//! NetSepio review contract indexing.
//!
//! This crate provides:
//! - Decoding of the contract's review and role events
//! - State transition functions that materialize `Review` and `User` entities
//! - Entity storage (SQLite, in-memory) with a point-lookup read interface
//! - A sync engine that follows the chain in ledger order
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  netsepio-indexer                   │
//! │                                     │
//! │  ┌─────────────────┐                │
//! │  │   Sync Engine   │ ← Ethereum RPC │
//! │  │  (tokio task)   │   5 event kinds│
//! │  └────────┬────────┘                │
//! │           │ IndexedEvent, in order  │
//! │      ┌────▼──────┐                  │
//! │      │ Dispatcher│                  │
//! │      └────┬──────┘                  │
//! │           │ one transition / kind   │
//! │      ┌────▼──────┐                  │
//! │      │  Storage  │ ← SQLite         │
//! │      │ reviews + │   full-overwrite │
//! │      │ users     │   upserts        │
//! │      └────┬──────┘                  │
//! │           │                         │
//! │      EntityReader (get_review,      │
//! │                    get_user)        │
//! └─────────────────────────────────────┘
//! ```
//!
//! Events are applied sequentially. Every transition is idempotent, so the
//! sync cursor can lag the entities by up to one range without harm.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod listener;
pub mod storage;

// Re-export common types
pub use dispatch::{Dispatcher, Outcome, SkipReason};
pub use netsepio_core::{
    known_role_name, role_id, AccountKey, Review, ReviewId, RoleKey, RoleSet, User,
};

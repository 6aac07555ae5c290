//! Event listener for the NetSepio review contract.
//!
//! This module provides:
//! - Event type definitions and log decoding
//! - The [`LogSource`] abstraction and its RPC implementation
//! - Sync engine for historical and live block processing

pub mod events;
pub mod provider;
pub mod sync;

pub use events::{DecodeError, IndexedEvent, LedgerEvent, LogPosition};
pub use provider::{LogSource, RpcProvider};
pub use sync::{rewind, RangeReport, SyncEngine, SyncError, SyncStep};

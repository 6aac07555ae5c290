//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, LogData, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use netsepio_indexer::listener::events::abi;
use netsepio_indexer::listener::LogSource;
use netsepio_indexer::storage::{
    CursorStore, EntityStore, MemoryStore, Storage, StoreError, StoreResult, SyncState,
};
use netsepio_indexer::{AccountKey, Review, ReviewId, User};
use tempfile::NamedTempFile;

/// A SQLite store on a throwaway file. The file lives as long as the fixture.
pub async fn sqlite_store() -> (Storage, NamedTempFile) {
    let temp_db = NamedTempFile::new().unwrap();
    let storage = Storage::new_with_path(temp_db.path()).await.unwrap();
    storage.run_migrations().await.unwrap();
    (storage, temp_db)
}

pub fn account(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

/// Wrap ABI-encoded event data into an RPC log at a ledger position.
pub fn log_at(data: LogData, block: u64, tx_index: u64, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: Address::repeat_byte(0xcc),
            data,
        },
        block_number: Some(block),
        transaction_index: Some(tx_index),
        log_index: Some(log_index),
        transaction_hash: Some(B256::with_last_byte(tx_index as u8)),
        ..Default::default()
    }
}

pub fn review_created(token: u64, receiver: Address) -> abi::ReviewCreated {
    abi::ReviewCreated {
        receiver,
        tokenId: U256::from(token),
        category: "A".to_string(),
        domainAddress: "ABC".to_string(),
        siteURL: "www.x.com".to_string(),
        siteType: "B".to_string(),
        siteTag: "Hello".to_string(),
        metadataURI: "ipfs://Q1".to_string(),
    }
}

pub fn review_updated(token: u64, by: Address, new_info_hash: &str) -> abi::ReviewUpdated {
    abi::ReviewUpdated {
        ownerOrApproved: by,
        tokenId: U256::from(token),
        oldInfoHash: String::new(),
        newInfoHash: new_info_hash.to_string(),
    }
}

pub fn review_deleted(token: u64, by: Address) -> abi::ReviewDeleted {
    abi::ReviewDeleted {
        ownerOrApproved: by,
        tokenId: U256::from(token),
    }
}

pub fn role_granted(role: B256, account: Address) -> abi::RoleGranted {
    abi::RoleGranted {
        role,
        account,
        sender: Address::repeat_byte(0xee),
    }
}

pub fn role_revoked(role: B256, account: Address) -> abi::RoleRevoked {
    abi::RoleRevoked {
        role,
        account,
        sender: Address::repeat_byte(0xee),
    }
}

/// Encode any routed event.
pub fn encode<E: SolEvent>(event: &E) -> LogData {
    event.encode_log_data()
}

/// In-memory log source serving a fixed set of logs.
///
/// Logs are returned in the order they were given, filtered by block range,
/// so tests can hand them out of ledger order on purpose.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    pub head: u64,
    pub logs: Vec<Log>,
}

impl ScriptedSource {
    pub fn new(head: u64, logs: Vec<Log>) -> Self {
        Self { head, logs }
    }
}

#[async_trait]
impl LogSource for ScriptedSource {
    async fn latest_block(&self) -> anyhow::Result<u64> {
        Ok(self.head)
    }

    async fn logs(&self, from_block: u64, to_block: u64) -> anyhow::Result<Vec<Log>> {
        Ok(self
            .logs
            .iter()
            .filter(|log| {
                log.block_number
                    .is_some_and(|block| (from_block..=to_block).contains(&block))
            })
            .cloned()
            .collect())
    }
}

/// How [`FlakyStore`] fails its writes.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Retryable timeout.
    Timeout,
    /// Non-retryable corrupt row.
    Corrupt,
}

/// Memory store whose next `failures` entity saves fail.
#[derive(Debug, Clone)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failures: Arc<AtomicU32>,
    kind: Failure,
    pub save_attempts: Arc<AtomicU32>,
}

impl FlakyStore {
    pub fn new(failures: u32, kind: Failure) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: Arc::new(AtomicU32::new(failures)),
            kind,
            save_attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    fn maybe_fail(&self, collection: &'static str) -> StoreResult<()> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining == 0 {
            return Ok(());
        }
        self.failures.store(remaining - 1, Ordering::SeqCst);

        Err(match self.kind {
            Failure::Timeout => StoreError::Timeout {
                op: "save",
                after: Duration::from_millis(1),
            },
            Failure::Corrupt => StoreError::Corrupt {
                collection,
                key: "test".to_string(),
                reason: "injected".to_string(),
            },
        })
    }
}

#[async_trait]
impl EntityStore for FlakyStore {
    async fn load_review(&self, id: &ReviewId) -> StoreResult<Option<Review>> {
        self.inner.load_review(id).await
    }

    async fn save_review(&self, review: &Review) -> StoreResult<()> {
        self.maybe_fail("reviews")?;
        self.inner.save_review(review).await
    }

    async fn reviews_by(&self, account: &AccountKey) -> StoreResult<Vec<Review>> {
        self.inner.reviews_by(account).await
    }

    async fn load_user(&self, id: &AccountKey) -> StoreResult<Option<User>> {
        self.inner.load_user(id).await
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        self.maybe_fail("users")?;
        self.inner.save_user(user).await
    }
}

#[async_trait]
impl CursorStore for FlakyStore {
    async fn get_sync_state(&self) -> StoreResult<SyncState> {
        self.inner.get_sync_state().await
    }

    async fn update_sync_state(&self, state: &SyncState) -> StoreResult<()> {
        self.inner.update_sync_state(state).await
    }
}

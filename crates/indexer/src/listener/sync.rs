//! Sync engine for historical and live block processing.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::events::{DecodeError, IndexedEvent, LogPosition};
use super::provider::LogSource;
use crate::config::{DecodeErrorPolicy, SyncConfig};
use crate::dispatch::{Dispatcher, Outcome};
use crate::storage::{CursorStore, EntityStore, StoreError, StoreResult, SyncState};

/// Errors that stop the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The log source failed. Transient; the run loop retries after a pause.
    #[error("log source failed: {0:#}")]
    Source(anyhow::Error),

    /// A routed log could not be decoded and the policy is to halt.
    #[error("undecodable log: {0}")]
    Decode(#[from] DecodeError),

    /// Applying an event failed and retries did not help.
    #[error("store failed at {position} after {attempts} attempt(s): {source}")]
    Store {
        /// Position of the event being applied
        position: LogPosition,
        /// Attempts made, including the first
        attempts: u32,
        /// Last store error
        #[source]
        source: StoreError,
    },

    /// Reading or writing the sync cursor failed.
    #[error("sync cursor: {0}")]
    Cursor(#[source] StoreError),

    /// A replay was asked to start past the blocks already processed.
    #[error("cannot replay from block {from_block}: cursor is at block {cursor}")]
    RewindPastCursor {
        /// Requested first block
        from_block: u64,
        /// Last processed block
        cursor: u64,
    },

    /// The database was populated from a different chain.
    #[error("database is pinned to chain {stored}, configured chain is {configured}")]
    ChainMismatch {
        /// Chain id recorded in the cursor
        stored: u64,
        /// Chain id from configuration
        configured: u64,
    },
}

/// Counters for one processed block range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeReport {
    /// First block of the range
    pub from_block: u64,
    /// Last block of the range
    pub to_block: u64,
    /// Events that changed entity state
    pub applied: u64,
    /// Events that left the store unchanged
    pub skipped: u64,
    /// Routed logs dropped under the skip policy
    pub undecodable: u64,
    /// Logs that are not NetSepio events, or were removed by a reorg
    pub unrouted: u64,
}

/// What one step of the sync loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// Nothing new below the confirmation depth.
    CaughtUp {
        /// Highest block with enough confirmations
        safe_block: u64,
    },
    /// A full batch was processed and more blocks are waiting.
    Historical(RangeReport),
    /// The remaining blocks up to the safe head were processed.
    Live(RangeReport),
}

/// Sync engine manages historical catch-up and live block synchronization.
///
/// Events are applied one at a time in ledger order. The cursor only moves
/// once every event of a range has been applied, so a crash re-delivers at
/// most one range, which the transitions absorb.
pub struct SyncEngine<P, S> {
    source: P,
    dispatcher: Dispatcher<S>,
    config: SyncConfig,
    chain_id: u64,
}

impl<P, S> SyncEngine<P, S>
where
    P: LogSource,
    S: EntityStore + CursorStore,
{
    /// Create a new sync engine.
    pub fn new(source: P, store: S, config: SyncConfig, chain_id: u64) -> Self {
        Self {
            source,
            dispatcher: Dispatcher::new(store),
            config,
            chain_id,
        }
    }

    /// The store events are applied to.
    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    /// Pin the cursor to this chain, positioning a fresh one just before
    /// `start_block`.
    pub async fn initialize(&self) -> Result<SyncState, SyncError> {
        let state = self.cursor().await?;

        if state.is_fresh() {
            let state = self
                .write_cursor(self.config.start_block.saturating_sub(1))
                .await?;
            info!(
                "Initialized sync cursor at block {} for chain {}",
                state.last_block_number, state.chain_id
            );
            return Ok(state);
        }

        if state.chain_id != 0 && state.chain_id != self.chain_id {
            return Err(SyncError::ChainMismatch {
                stored: state.chain_id,
                configured: self.chain_id,
            });
        }

        if state.chain_id == 0 {
            return self.write_cursor(state.last_block_number).await;
        }

        Ok(state)
    }

    /// Run the sync loop (historical + live).
    ///
    /// This method runs until a non-transient error occurs, processing
    /// historical blocks in batches until caught up, then switching to live
    /// polling mode.
    pub async fn run(&self) -> Result<(), SyncError> {
        info!("Sync engine starting...");
        self.initialize().await?;

        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);

        loop {
            match self.sync_once().await {
                Ok(SyncStep::Historical(_)) => continue,
                Ok(SyncStep::Live(_)) => {}
                Ok(SyncStep::CaughtUp { safe_block }) => {
                    debug!(
                        "Caught up at block {}, waiting {} seconds for new blocks...",
                        safe_block, self.config.poll_interval_secs
                    );
                }
                Err(SyncError::Source(e)) => {
                    warn!("Log source unavailable, retrying: {:#}", e);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Process the next range of confirmed blocks, if any.
    pub async fn sync_once(&self) -> Result<SyncStep, SyncError> {
        let state = self.cursor().await?;
        let current_block = self
            .source
            .latest_block()
            .await
            .map_err(SyncError::Source)?;
        let safe_block = current_block.saturating_sub(self.config.confirmations);
        let last_synced = state.last_block_number;

        debug!(
            "Sync status: last={}, current={}, safe={}, confirmations={}",
            last_synced, current_block, safe_block, self.config.confirmations
        );

        let blocks_behind = safe_block.saturating_sub(last_synced);
        if blocks_behind == 0 {
            return Ok(SyncStep::CaughtUp { safe_block });
        }

        if blocks_behind > self.config.batch_size {
            let batch_end = last_synced + self.config.batch_size;
            info!(
                "Historical sync: processing blocks {} to {} ({} blocks behind)",
                last_synced + 1,
                batch_end,
                blocks_behind
            );
            let report = self.sync_range(last_synced + 1, batch_end).await?;
            Ok(SyncStep::Historical(report))
        } else {
            let report = self.sync_range(last_synced + 1, safe_block).await?;
            Ok(SyncStep::Live(report))
        }
    }

    /// Fetch, decode and apply every event in `from..=to`, then move the
    /// cursor to `to` (never backwards). A rewind that lands while the range
    /// is in flight is kept, so the next step replays from it.
    ///
    /// Logs are decoded before anything is applied, so a halting decode error
    /// leaves the store untouched for this range.
    pub async fn sync_range(&self, from: u64, to: u64) -> Result<RangeReport, SyncError> {
        let started_at = self.cursor().await?.last_block_number;
        let logs = self.source.logs(from, to).await.map_err(SyncError::Source)?;

        let mut report = RangeReport {
            from_block: from,
            to_block: to,
            ..Default::default()
        };

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            if log.removed {
                debug!(tx_hash = ?log.transaction_hash, "Ignoring removed log");
                report.unrouted += 1;
                continue;
            }

            match IndexedEvent::from_log(log) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {
                    debug!(
                        topic0 = ?log.inner.data.topics().first(),
                        "Ignoring unrouted log"
                    );
                    report.unrouted += 1;
                }
                Err(e) => match self.config.on_decode_error {
                    DecodeErrorPolicy::Halt => return Err(SyncError::Decode(e)),
                    DecodeErrorPolicy::Skip => {
                        error!(
                            error = %e,
                            block = ?log.block_number,
                            log_index = ?log.log_index,
                            tx_hash = ?log.transaction_hash,
                            "Skipping undecodable log"
                        );
                        report.undecodable += 1;
                    }
                },
            }
        }

        // Nodes may return logs out of order, and overlapping pages may repeat
        // them.
        events.sort_by_key(|event| event.position);
        events.dedup_by_key(|event| event.position);

        for event in &events {
            let outcome = self.apply(event).await?;
            match outcome {
                Outcome::Applied => report.applied += 1,
                Outcome::Skipped(reason) => {
                    debug!(position = %event.position, ?reason, "Event skipped");
                    report.skipped += 1;
                }
            }
        }

        let state = self.cursor().await?;
        if state.last_block_number < started_at {
            warn!(
                "Sync cursor was rewound to block {} while processing blocks {} to {}, keeping it",
                state.last_block_number, from, to
            );
        } else {
            self.write_cursor(state.last_block_number.max(to)).await?;
        }

        if !events.is_empty() || report.undecodable > 0 {
            info!(
                "Blocks {} to {}: {} applied, {} skipped, {} undecodable",
                from, to, report.applied, report.skipped, report.undecodable
            );
        }

        Ok(report)
    }

    /// Apply one event, retrying retryable store failures with backoff.
    async fn apply(&self, event: &IndexedEvent) -> Result<Outcome, SyncError> {
        let dispatcher = &self.dispatcher;
        let ledger_event = &event.event;

        debug!(position = %event.position, kind = ledger_event.kind(), "Applying event");

        self.with_retry(move || dispatcher.apply(ledger_event))
            .await
            .map_err(|(attempts, source)| SyncError::Store {
                position: event.position,
                attempts,
                source,
            })
    }

    async fn cursor(&self) -> Result<SyncState, SyncError> {
        let store = self.store();
        self.with_retry(move || store.get_sync_state())
            .await
            .map_err(|(_, e)| SyncError::Cursor(e))
    }

    async fn write_cursor(&self, last_block_number: u64) -> Result<SyncState, SyncError> {
        let state = SyncState {
            last_block_number,
            updated_at: chrono::Utc::now().timestamp(),
            chain_id: self.chain_id,
        };

        let store = self.store();
        let next = &state;
        self.with_retry(move || store.update_sync_state(next))
            .await
            .map_err(|(_, e)| SyncError::Cursor(e))?;

        Ok(state)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_retries` retries are spent. Errors carry the attempt count.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T, (u32, StoreError)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.config.max_retries => {
                    let delay = self.config.backoff(attempt);
                    warn!(
                        "Retryable store error (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        self.config.max_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err((attempt, e)),
            }
        }
    }
}

/// Move the cursor so the next run re-applies events from `from_block`.
///
/// Entities are left as they are; re-application is idempotent. The cursor
/// is never moved forward, since that would drop the events in between, and
/// a cursor pinned to another chain is refused. Stop the indexer first: a
/// range in flight that started above the new cursor does not write over it,
/// but one that started below does.
pub async fn rewind<S: CursorStore>(
    store: &S,
    from_block: u64,
    chain_id: u64,
) -> Result<SyncState, SyncError> {
    let current = store.get_sync_state().await.map_err(SyncError::Cursor)?;

    if current.chain_id != 0 && current.chain_id != chain_id {
        return Err(SyncError::ChainMismatch {
            stored: current.chain_id,
            configured: chain_id,
        });
    }

    let target = from_block.saturating_sub(1);
    if target > current.last_block_number {
        return Err(SyncError::RewindPastCursor {
            from_block,
            cursor: current.last_block_number,
        });
    }

    let state = SyncState {
        last_block_number: target,
        updated_at: chrono::Utc::now().timestamp(),
        chain_id,
    };
    store
        .update_sync_state(&state)
        .await
        .map_err(SyncError::Cursor)?;

    info!(
        "Sync cursor rewound from block {} to {}",
        current.last_block_number, state.last_block_number
    );
    Ok(state)
}

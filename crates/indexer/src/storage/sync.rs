//! Sync state storage operations.

use super::{Storage, StoreResult, SyncState};
use sqlx::Row;

impl Storage {
    /// Get the current sync state.
    pub async fn fetch_sync_state(&self) -> StoreResult<SyncState> {
        let row = self
            .bounded(
                "get_sync_state",
                sqlx::query(
                    r#"
                    SELECT last_block_number, updated_at, chain_id
                    FROM sync_state
                    WHERE id = 1
                    "#,
                )
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(SyncState {
            last_block_number: row.get::<i64, _>("last_block_number") as u64,
            updated_at: row.get("updated_at"),
            chain_id: row.get::<i64, _>("chain_id") as u64,
        })
    }

    /// Update the sync state.
    pub async fn write_sync_state(&self, state: &SyncState) -> StoreResult<()> {
        self.bounded(
            "update_sync_state",
            sqlx::query(
                r#"
                UPDATE sync_state
                SET last_block_number = ?,
                    updated_at = ?,
                    chain_id = ?
                WHERE id = 1
                "#,
            )
            .bind(state.last_block_number as i64)
            .bind(state.updated_at)
            .bind(state.chain_id as i64)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }
}

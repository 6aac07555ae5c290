//! User storage operations.

use super::types::USERS;
use super::{Storage, StoreError, StoreResult};
use netsepio_core::{AccountKey, RoleSet, User};
use sqlx::Row;

impl Storage {
    /// Upsert a user, replacing its stored role set.
    ///
    /// Roles are stored as a JSON array in grant order.
    pub async fn upsert_user(&self, user: &User) -> StoreResult<()> {
        let id = user.id.to_string();
        let roles = serde_json::to_string(&user.roles).map_err(|source| {
            StoreError::Serialization {
                collection: USERS,
                key: id.clone(),
                source,
            }
        })?;

        self.bounded(
            "save_user",
            sqlx::query(
                r#"
                INSERT INTO users (id, roles)
                VALUES (?, ?)
                ON CONFLICT(id) DO UPDATE SET roles = excluded.roles
                "#,
            )
            .bind(&id)
            .bind(&roles)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    /// Get a user by normalized address.
    pub async fn fetch_user(&self, id: &AccountKey) -> StoreResult<Option<User>> {
        let key = id.to_string();
        let row = self
            .bounded(
                "load_user",
                sqlx::query("SELECT roles FROM users WHERE id = ?")
                    .bind(&key)
                    .fetch_optional(&self.pool),
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let corrupt = |reason: String| StoreError::Corrupt {
            collection: USERS,
            key: key.clone(),
            reason,
        };
        let roles_json: String = row
            .try_get("roles")
            .map_err(|e| corrupt(format!("column roles: {e}")))?;
        let roles: RoleSet =
            serde_json::from_str(&roles_json).map_err(|e| corrupt(format!("roles: {e}")))?;

        Ok(Some(User { id: *id, roles }))
    }
}

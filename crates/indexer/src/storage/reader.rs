//! Point-lookup interface for query layers.
//!
//! Readers hand over raw key strings as they arrive from a request; keys are
//! normalized here so `0xAB..` and `0xab..` resolve to the same user.

use async_trait::async_trait;
use netsepio_core::{AccountKey, CoreError, Review, ReviewId, User};
use thiserror::Error;

use super::{EntityStore, StoreError};

/// Errors returned by [`EntityReader`].
#[derive(Debug, Error)]
pub enum ReadError {
    /// The requested key is not a valid token id or address.
    #[error(transparent)]
    InvalidKey(#[from] CoreError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read side of the materialized entities.
#[async_trait]
pub trait EntityReader {
    /// Look up a review by its token id in decimal form.
    async fn get_review(&self, token_id: &str) -> Result<Option<Review>, ReadError>;

    /// Look up a user by address, in any casing.
    async fn get_user(&self, address: &str) -> Result<Option<User>, ReadError>;

    /// Reviews authored by an address, in token id order.
    async fn get_reviews_by(&self, address: &str) -> Result<Vec<Review>, ReadError>;
}

#[async_trait]
impl<S: EntityStore> EntityReader for S {
    async fn get_review(&self, token_id: &str) -> Result<Option<Review>, ReadError> {
        let id: ReviewId = token_id.parse()?;
        Ok(self.load_review(&id).await?)
    }

    async fn get_user(&self, address: &str) -> Result<Option<User>, ReadError> {
        let id: AccountKey = address.parse()?;
        Ok(self.load_user(&id).await?)
    }

    async fn get_reviews_by(&self, address: &str) -> Result<Vec<Review>, ReadError> {
        let id: AccountKey = address.parse()?;
        Ok(self.reviews_by(&id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use netsepio_core::Address;

    #[tokio::test]
    async fn test_get_user_normalizes_address() {
        let store = MemoryStore::new();
        let user = User::create(AccountKey::from(Address::repeat_byte(0xab)));
        store.save_user(&user).await.unwrap();

        let upper = format!("0x{}", "AB".repeat(20));
        assert_eq!(store.get_user(&upper).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_invalid_keys() {
        let store = MemoryStore::new();

        assert!(matches!(
            store.get_review("0x07").await,
            Err(ReadError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get_user("alice").await,
            Err(ReadError::InvalidKey(_))
        ));
        assert!(store.get_review("7").await.unwrap().is_none());
    }
}

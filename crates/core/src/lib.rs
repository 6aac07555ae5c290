//! # NetSepio Core
//!
//! Domain types shared by the NetSepio review indexer and its readers.
//!
//! This crate has no I/O. It defines what the indexer materializes and how
//! entities are addressed:
//!
//! - **Keys**: [`AccountKey`], [`RoleKey`] and [`ReviewId`], canonical string
//!   forms of ledger addresses, role identifiers and token ids
//! - **Entities**: [`Review`] and [`User`]
//! - **Role sets**: [`RoleSet`], the duplicate-free membership set of a user
//! - **Roles**: the well-known NetSepio role identifiers

#![warn(missing_docs)]

pub mod constants;
pub mod entity;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use entity::{Review, RoleSet, User};
pub use error::{CoreError, Result};
pub use types::*;

// Re-export Alloy primitives for convenience
pub use alloy_primitives::{Address, B256, U256};

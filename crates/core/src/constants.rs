//! Well-known NetSepio role identifiers.
//!
//! The contract derives its roles as `keccak256(name)`, except for the
//! AccessControl admin role which is the zero word.

use alloy_primitives::{keccak256, B256};

use crate::types::RoleKey;

/// AccessControl `DEFAULT_ADMIN_ROLE`.
pub const DEFAULT_ADMIN_ROLE: B256 = B256::ZERO;

/// Names of the roles defined by the NetSepio contract.
pub const NETSEPIO_ROLE_NAMES: [&str; 3] = [
    "NETSEPIO_ADMIN_ROLE",
    "NETSEPIO_MODERATOR_ROLE",
    "NETSEPIO_REVIEWER_ROLE",
];

/// Role identifier for a role name, as computed by the contract.
pub fn role_id(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

/// Human-readable name of a well-known role, if it is one.
pub fn known_role_name(role: &RoleKey) -> Option<&'static str> {
    if role.as_b256() == DEFAULT_ADMIN_ROLE {
        return Some("DEFAULT_ADMIN_ROLE");
    }
    NETSEPIO_ROLE_NAMES
        .iter()
        .copied()
        .find(|name| role_id(name) == role.as_b256())
}

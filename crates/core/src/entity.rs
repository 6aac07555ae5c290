//! Materialized entities.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::types::{AccountKey, ReviewId, RoleKey};

/// A user-submitted site assessment, keyed by its token id.
///
/// Reviews are never removed; deletion on the ledger sets the `deleted`
/// tombstone so historical queries keep resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Token id in decimal form.
    pub id: ReviewId,

    /// Review category.
    pub category: String,

    /// Domain the review is about.
    pub domain_address: String,

    /// Reviewed site URL.
    #[serde(rename = "siteURL")]
    pub site_url: String,

    /// Site type.
    pub site_type: String,

    /// Free-form site tag.
    pub site_tag: String,

    /// Safety classification. Currently always a copy of `category`.
    pub site_safety: String,

    /// Off-chain metadata pointer.
    #[serde(rename = "metaDataUri")]
    pub metadata_uri: String,

    /// Account that received the review token.
    pub review_by: AccountKey,

    /// Tombstone set by a deletion event.
    pub deleted: bool,

    /// Latest content-integrity pointer (empty until the first update).
    pub info_hash: String,
}

impl Review {
    /// A default-valued review for `id`. Not persisted.
    pub fn create(id: ReviewId) -> Self {
        Self {
            id,
            category: String::new(),
            domain_address: String::new(),
            site_url: String::new(),
            site_type: String::new(),
            site_tag: String::new(),
            site_safety: String::new(),
            metadata_uri: String::new(),
            review_by: AccountKey::new(Address::ZERO),
            deleted: false,
            info_hash: String::new(),
        }
    }
}

/// A ledger account that has interacted with the review contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Normalized account address.
    pub id: AccountKey,

    /// Roles currently held.
    pub roles: RoleSet,
}

impl User {
    /// A user with no roles. Not persisted.
    pub fn create(id: AccountKey) -> Self {
        Self {
            id,
            roles: RoleSet::new(),
        }
    }
}

/// Duplicate-free set of roles.
///
/// Entries keep their grant order for stable output, but two sets holding
/// the same roles compare equal regardless of order.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RoleKey>", into = "Vec<RoleKey>")]
pub struct RoleSet(Vec<RoleKey>);

impl RoleSet {
    /// An empty set.
    pub const fn new() -> Self {
        RoleSet(Vec::new())
    }

    /// Add `role` if absent. Returns `true` if the set changed.
    pub fn grant(&mut self, role: RoleKey) -> bool {
        if self.contains(&role) {
            return false;
        }
        self.0.push(role);
        true
    }

    /// Remove `role` if present. Returns `true` if the set changed.
    pub fn revoke(&mut self, role: &RoleKey) -> bool {
        match self.0.iter().position(|held| held == role) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `role` is held.
    pub fn contains(&self, role: &RoleKey) -> bool {
        self.0.contains(role)
    }

    /// Number of roles held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no roles are held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate roles in grant order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleKey> {
        self.0.iter()
    }
}

impl PartialEq for RoleSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|role| other.contains(role))
    }
}

impl From<Vec<RoleKey>> for RoleSet {
    fn from(roles: Vec<RoleKey>) -> Self {
        roles.into_iter().collect()
    }
}

impl FromIterator<RoleKey> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleKey>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.grant(role);
        }
        set
    }
}

impl From<RoleSet> for Vec<RoleKey> {
    fn from(set: RoleSet) -> Self {
        set.0
    }
}

//! Event type definitions and the log decoder for the NetSepio contract.
//!
//! Raw logs are decoded once, at the boundary, into [`LedgerEvent`]: one
//! payload struct per event kind, with addresses, roles and token ids already
//! normalized into entity keys.

use alloy::primitives::B256;
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use netsepio_core::{AccountKey, ReviewId, RoleKey};
use std::fmt;
use thiserror::Error;

/// ABI definitions of the routed events.
pub mod abi {
    use alloy::sol;

    sol! {
        /// A review token was minted to `receiver`.
        #[derive(Debug, PartialEq, Eq)]
        event ReviewCreated(
            address indexed receiver,
            uint256 indexed tokenId,
            string category,
            string domainAddress,
            string siteURL,
            string siteType,
            string siteTag,
            string metadataURI
        );

        /// The info hash of a review changed.
        #[derive(Debug, PartialEq, Eq)]
        event ReviewUpdated(
            address indexed ownerOrApproved,
            uint256 indexed tokenId,
            string oldInfoHash,
            string newInfoHash
        );

        /// A review token was burned.
        #[derive(Debug, PartialEq, Eq)]
        event ReviewDeleted(address indexed ownerOrApproved, uint256 indexed tokenId);

        /// AccessControl role grant.
        #[derive(Debug, PartialEq, Eq)]
        event RoleGranted(bytes32 indexed role, address indexed account, address indexed sender);

        /// AccessControl role revocation.
        #[derive(Debug, PartialEq, Eq)]
        event RoleRevoked(bytes32 indexed role, address indexed account, address indexed sender);
    }
}

/// Signature hashes (`topic0`) of every routed event.
pub fn routed_signatures() -> [B256; 5] {
    [
        abi::ReviewCreated::SIGNATURE_HASH,
        abi::ReviewUpdated::SIGNATURE_HASH,
        abi::ReviewDeleted::SIGNATURE_HASH,
        abi::RoleGranted::SIGNATURE_HASH,
        abi::RoleRevoked::SIGNATURE_HASH,
    ]
}

/// Position of a log in the ledger.
///
/// Ordering is lexicographic over (block, transaction, log), which is the
/// order the ledger emitted the events in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    /// Block number
    pub block_number: u64,

    /// Transaction index within block
    pub tx_index: u64,

    /// Log index within the block
    pub log_index: u64,
}

impl LogPosition {
    /// Create a new log position.
    pub fn new(block_number: u64, tx_index: u64, log_index: u64) -> Self {
        Self {
            block_number,
            tx_index,
            log_index,
        }
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} tx {} log {}",
            self.block_number, self.tx_index, self.log_index
        )
    }
}

/// Payload of a review creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCreated {
    /// Account that received the review token
    pub receiver: AccountKey,
    /// Review key derived from the token id
    pub review_id: ReviewId,
    /// Review category
    pub category: String,
    /// Domain under review
    pub domain_address: String,
    /// Site URL
    pub site_url: String,
    /// Site type
    pub site_type: String,
    /// Site tag
    pub site_tag: String,
    /// Off-chain metadata pointer
    pub metadata_uri: String,
}

/// Payload of a review info-hash update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewUpdated {
    /// Owner or approved operator that issued the update
    pub owner_or_approved: AccountKey,
    /// Review key derived from the token id
    pub review_id: ReviewId,
    /// Previous info hash as seen by the contract
    pub old_info_hash: String,
    /// New info hash
    pub new_info_hash: String,
}

/// Payload of a review deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDeleted {
    /// Owner or approved operator that burned the token
    pub owner_or_approved: AccountKey,
    /// Review key derived from the token id
    pub review_id: ReviewId,
}

/// Payload shared by role grants and revocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    /// Role identifier
    pub role: RoleKey,
    /// Account whose membership changed
    pub account: AccountKey,
    /// Account that issued the change
    pub sender: AccountKey,
}

/// Decoded NetSepio event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// See [`ReviewCreated`]
    ReviewCreated(ReviewCreated),
    /// See [`ReviewUpdated`]
    ReviewUpdated(ReviewUpdated),
    /// See [`ReviewDeleted`]
    ReviewDeleted(ReviewDeleted),
    /// Role granted to an account
    RoleGranted(RoleChange),
    /// Role revoked from an account
    RoleRevoked(RoleChange),
}

impl LedgerEvent {
    /// Event name as declared in the contract.
    pub fn kind(&self) -> &'static str {
        let kind = match self {
            LedgerEvent::ReviewCreated(_) => EventKind::ReviewCreated,
            LedgerEvent::ReviewUpdated(_) => EventKind::ReviewUpdated,
            LedgerEvent::ReviewDeleted(_) => EventKind::ReviewDeleted,
            LedgerEvent::RoleGranted(_) => EventKind::RoleGranted,
            LedgerEvent::RoleRevoked(_) => EventKind::RoleRevoked,
        };
        kind.name()
    }
}

/// A decoded event together with where it sits in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEvent {
    /// Ledger position
    pub position: LogPosition,

    /// Transaction hash
    pub tx_hash: Option<B256>,

    /// Decoded payload
    pub event: LedgerEvent,
}

/// Failure to decode a log whose signature is routed.
///
/// The event schema is fixed at deployment, so these indicate a mismatch
/// between the indexer and the contract rather than bad luck at runtime.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload did not match the ABI of its event.
    #[error("malformed {kind} log at {position}: {source}")]
    Malformed {
        /// Event name
        kind: &'static str,
        /// Ledger position
        position: LogPosition,
        /// ABI decoder error
        #[source]
        source: alloy::sol_types::Error,
    },

    /// The log has no block coordinates (pending or synthetic log).
    #[error("{kind} log is missing {field}")]
    MissingCoordinates {
        /// Event name
        kind: &'static str,
        /// Absent field
        field: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
enum EventKind {
    ReviewCreated,
    ReviewUpdated,
    ReviewDeleted,
    RoleGranted,
    RoleRevoked,
}

impl EventKind {
    fn from_topic(topic0: B256) -> Option<Self> {
        if topic0 == abi::ReviewCreated::SIGNATURE_HASH {
            Some(Self::ReviewCreated)
        } else if topic0 == abi::ReviewUpdated::SIGNATURE_HASH {
            Some(Self::ReviewUpdated)
        } else if topic0 == abi::ReviewDeleted::SIGNATURE_HASH {
            Some(Self::ReviewDeleted)
        } else if topic0 == abi::RoleGranted::SIGNATURE_HASH {
            Some(Self::RoleGranted)
        } else if topic0 == abi::RoleRevoked::SIGNATURE_HASH {
            Some(Self::RoleRevoked)
        } else {
            None
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::ReviewCreated => "ReviewCreated",
            Self::ReviewUpdated => "ReviewUpdated",
            Self::ReviewDeleted => "ReviewDeleted",
            Self::RoleGranted => "RoleGranted",
            Self::RoleRevoked => "RoleRevoked",
        }
    }
}

impl IndexedEvent {
    /// Decode a raw log.
    ///
    /// Returns `Ok(None)` for logs that carry no signature or a signature that
    /// is not routed; those are not this indexer's concern.
    pub fn from_log(log: &Log) -> Result<Option<Self>, DecodeError> {
        let Some(topic0) = log.inner.data.topics().first().copied() else {
            return Ok(None);
        };

        let Some(kind) = EventKind::from_topic(topic0) else {
            return Ok(None);
        };

        let position = Self::position(log, kind.name())?;
        let malformed = |source| DecodeError::Malformed {
            kind: kind.name(),
            position,
            source,
        };
        let data = &log.inner.data;

        let event = match kind {
            EventKind::ReviewCreated => {
                let e = abi::ReviewCreated::decode_log_data(data, true).map_err(malformed)?;
                LedgerEvent::ReviewCreated(ReviewCreated {
                    receiver: AccountKey::from(e.receiver),
                    review_id: ReviewId::from(e.tokenId),
                    category: e.category,
                    domain_address: e.domainAddress,
                    site_url: e.siteURL,
                    site_type: e.siteType,
                    site_tag: e.siteTag,
                    metadata_uri: e.metadataURI,
                })
            }
            EventKind::ReviewUpdated => {
                let e = abi::ReviewUpdated::decode_log_data(data, true).map_err(malformed)?;
                LedgerEvent::ReviewUpdated(ReviewUpdated {
                    owner_or_approved: AccountKey::from(e.ownerOrApproved),
                    review_id: ReviewId::from(e.tokenId),
                    old_info_hash: e.oldInfoHash,
                    new_info_hash: e.newInfoHash,
                })
            }
            EventKind::ReviewDeleted => {
                let e = abi::ReviewDeleted::decode_log_data(data, true).map_err(malformed)?;
                LedgerEvent::ReviewDeleted(ReviewDeleted {
                    owner_or_approved: AccountKey::from(e.ownerOrApproved),
                    review_id: ReviewId::from(e.tokenId),
                })
            }
            EventKind::RoleGranted => {
                let e = abi::RoleGranted::decode_log_data(data, true).map_err(malformed)?;
                LedgerEvent::RoleGranted(RoleChange {
                    role: RoleKey::from(e.role),
                    account: AccountKey::from(e.account),
                    sender: AccountKey::from(e.sender),
                })
            }
            EventKind::RoleRevoked => {
                let e = abi::RoleRevoked::decode_log_data(data, true).map_err(malformed)?;
                LedgerEvent::RoleRevoked(RoleChange {
                    role: RoleKey::from(e.role),
                    account: AccountKey::from(e.account),
                    sender: AccountKey::from(e.sender),
                })
            }
        };

        Ok(Some(Self {
            position,
            tx_hash: log.transaction_hash,
            event,
        }))
    }

    fn position(log: &Log, kind: &'static str) -> Result<LogPosition, DecodeError> {
        let missing = |field| DecodeError::MissingCoordinates { kind, field };

        Ok(LogPosition {
            block_number: log.block_number.ok_or_else(|| missing("block_number"))?,
            tx_index: log
                .transaction_index
                .ok_or_else(|| missing("transaction_index"))?,
            log_index: log.log_index.ok_or_else(|| missing("log_index"))?,
        })
    }
}

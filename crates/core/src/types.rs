//! Normalized entity keys.
//!
//! Every entity is addressed by a canonical string so that the same ledger
//! value always maps to the same row, regardless of how it was spelled on
//! input:
//!
//! - accounts: lower-case, `0x`-prefixed, 40 hex digits
//! - roles: lower-case, `0x`-prefixed, 64 hex digits
//! - reviews: the token id in decimal, without leading zeros

use alloy_primitives::{hex, Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Strip an optional `0x` / `0X` prefix and require exactly `len` hex digits.
fn strip_hex(input: &str, len: usize) -> Option<&str> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    (digits.len() == len && digits.chars().all(|c| c.is_ascii_hexdigit())).then_some(digits)
}

/// Normalized key of a ledger account (a [`User`](crate::User)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountKey(Address);

impl AccountKey {
    /// Wrap a ledger address.
    pub const fn new(address: Address) -> Self {
        AccountKey(address)
    }

    /// The underlying address.
    pub const fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for AccountKey {
    fn from(address: Address) -> Self {
        AccountKey(address)
    }
}

impl FromStr for AccountKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex(s, 40).ok_or_else(|| CoreError::InvalidAddress(s.to_string()))?;
        let bytes = hex::decode_to_array::<_, 20>(digits)
            .map_err(|_| CoreError::InvalidAddress(s.to_string()))?;
        Ok(AccountKey(Address::from(bytes)))
    }
}

impl TryFrom<String> for AccountKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountKey> for String {
    fn from(key: AccountKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for AccountKey {
    // `Address`'s own Display is EIP-55 mixed case; keys are always lower case.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(self.0.as_slice()))
    }
}

/// Normalized role identifier (AccessControl `bytes32` role).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleKey(B256);

impl RoleKey {
    /// Wrap a role identifier.
    pub const fn new(role: B256) -> Self {
        RoleKey(role)
    }

    /// The underlying 32-byte identifier.
    pub const fn as_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for RoleKey {
    fn from(role: B256) -> Self {
        RoleKey(role)
    }
}

impl FromStr for RoleKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex(s, 64).ok_or_else(|| CoreError::InvalidRole(s.to_string()))?;
        let bytes = hex::decode_to_array::<_, 32>(digits)
            .map_err(|_| CoreError::InvalidRole(s.to_string()))?;
        Ok(RoleKey(B256::from(bytes)))
    }
}

impl TryFrom<String> for RoleKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoleKey> for String {
    fn from(key: RoleKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(self.0.as_slice()))
    }
}

/// Key of a [`Review`](crate::Review): the token id in canonical decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReviewId(String);

impl ReviewId {
    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The token id this key was derived from.
    pub fn token_id(&self) -> U256 {
        // Construction guarantees a canonical decimal that fits in 256 bits.
        U256::from_str_radix(&self.0, 10).unwrap_or_default()
    }
}

impl From<U256> for ReviewId {
    fn from(token_id: U256) -> Self {
        ReviewId(token_id.to_string())
    }
}

impl From<u64> for ReviewId {
    fn from(token_id: u64) -> Self {
        ReviewId(token_id.to_string())
    }
}

impl FromStr for ReviewId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidTokenId(s.to_string());

        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if s.len() > 1 && s.starts_with('0') {
            return Err(invalid());
        }

        let token_id = U256::from_str_radix(s, 10).map_err(|_| invalid())?;
        Ok(ReviewId::from(token_id))
    }
}

impl TryFrom<String> for ReviewId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReviewId> for String {
    fn from(id: ReviewId) -> Self {
        id.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn test_account_key_is_lower_case() {
        let addr = address!("AbCdEf0123456789aBcDeF0123456789AbCdEf01");
        let key = AccountKey::from(addr);
        assert_eq!(key.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(key.address(), addr);
    }

    #[test]
    fn test_account_key_parse_is_case_insensitive() {
        let lower: AccountKey = "0xabcdef0123456789abcdef0123456789abcdef01".parse().unwrap();
        let upper: AccountKey = "0XABCDEF0123456789ABCDEF0123456789ABCDEF01".parse().unwrap();
        let bare: AccountKey = "AbCdEf0123456789aBcDeF0123456789AbCdEf01".parse().unwrap();

        assert_eq!(lower, upper);
        assert_eq!(lower, bare);
    }

    #[test]
    fn test_account_key_rejects_invalid() {
        assert!("".parse::<AccountKey>().is_err());
        assert!("0x1234".parse::<AccountKey>().is_err());
        assert!("0xzzcdef0123456789abcdef0123456789abcdef01"
            .parse::<AccountKey>()
            .is_err());

        let err = "nope".parse::<AccountKey>().unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_role_key_round_trip() {
        let role = b256!("7a8dc26796a1e50e6e190b70259f58f6a4edd5b22280ceecc82b687b8e982869");
        let key = RoleKey::from(role);
        let text = key.to_string();

        assert_eq!(
            text,
            "0x7a8dc26796a1e50e6e190b70259f58f6a4edd5b22280ceecc82b687b8e982869"
        );
        assert_eq!(text.to_uppercase().parse::<RoleKey>().unwrap(), key);
        assert_eq!(text[2..].parse::<RoleKey>().unwrap(), key);
        assert_eq!(
            "0x1234".parse::<RoleKey>().unwrap_err(),
            CoreError::InvalidRole("0x1234".to_string())
        );
    }

    #[test]
    fn test_review_id_from_token_id() {
        assert_eq!(ReviewId::from(U256::from(7u64)).as_str(), "7");
        assert_eq!(ReviewId::from(U256::MAX).to_string(), U256::MAX.to_string());
        assert_eq!(ReviewId::from(42u64).token_id(), U256::from(42u64));
    }

    #[test]
    fn test_review_id_parse_is_canonical() {
        assert_eq!("7".parse::<ReviewId>().unwrap(), ReviewId::from(7u64));
        assert_eq!("0".parse::<ReviewId>().unwrap(), ReviewId::from(0u64));

        assert!("007".parse::<ReviewId>().is_err());
        assert!("-1".parse::<ReviewId>().is_err());
        assert!("0x07".parse::<ReviewId>().is_err());
        assert!("".parse::<ReviewId>().is_err());

        let too_big = format!("{}0", U256::MAX);
        assert!(too_big.parse::<ReviewId>().is_err());
    }

    #[test]
    fn test_keys_serialize_as_strings() {
        let key = AccountKey::from(Address::repeat_byte(0xaa));
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "aa".repeat(20)));

        let back: AccountKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        assert!(serde_json::from_str::<ReviewId>("\"01\"").is_err());
    }
}

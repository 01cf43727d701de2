//! Account addresses and hash values.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

/// Address length in bytes
pub const ADDRESS_LENGTH: usize = 32;

/// Address of the privileged association account
pub const ASSOCIATION_ADDRESS_HEX: &str = "0xA550C18";

/// Error parsing an address literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    /// Missing `0x` prefix
    #[error("address '{0}' must start with 0x")]
    MissingPrefix(String),
    /// More than 64 hex digits
    #[error("address '{0}' is longer than 32 bytes")]
    TooLong(String),
    /// Not hexadecimal
    #[error("address '{0}' is not valid hex")]
    InvalidHex(String),
}

/// 32-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
    /// The reserved zero address
    pub const ZERO: AccountAddress = AccountAddress([0u8; ADDRESS_LENGTH]);

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Deterministic address for a named test account.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(b"account:");
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// The association account address.
    pub fn association() -> Self {
        // The constant is a valid literal
        Self::from_hex_literal(ASSOCIATION_ADDRESS_HEX).unwrap_or(Self::ZERO)
    }

    /// Parse `0x`-prefixed hex, left-padding short literals with zeros.
    pub fn from_hex_literal(literal: &str) -> Result<Self, AddressParseError> {
        let digits = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError::MissingPrefix(literal.to_string()))?;

        if digits.len() > ADDRESS_LENGTH * 2 {
            return Err(AddressParseError::TooLong(literal.to_string()));
        }

        let padded = format!("{:0>width$}", digits, width = ADDRESS_LENGTH * 2);
        let decoded =
            hex::decode(&padded).map_err(|_| AddressParseError::InvalidHex(literal.to_string()))?;

        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Full `0x`-prefixed literal, usable inside scripts.
    pub fn to_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Abbreviated form for logs.
    pub fn short_str(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl FromStr for AccountAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_literal(s)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.short_str())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_literal())
    }
}

/// SHA3-256 digest used for block ids, transaction hashes and state roots.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HashValue([u8; 32]);

impl HashValue {
    /// All-zero hash
    pub const ZERO: HashValue = HashValue([0u8; 32]);

    /// Hash arbitrary bytes.
    pub fn sha3_256_of(data: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(data);
        Self::from_digest(hasher)
    }

    /// Finish a running hasher.
    pub fn from_digest(hasher: Sha3_256) -> Self {
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashValue({})", hex::encode(&self.0[..4]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_literal_is_left_padded() {
        let addr = AccountAddress::from_hex_literal("0x1").unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 1;
        assert_eq!(addr, AccountAddress::new(expected));
    }

    #[test]
    fn test_association_address() {
        let addr = AccountAddress::association();
        assert_ne!(addr, AccountAddress::ZERO);
        assert!(addr.to_literal().ends_with("a550c18"));
    }

    #[test]
    fn test_literal_round_trip() {
        let addr = AccountAddress::from_name("alice");
        assert_eq!(
            AccountAddress::from_hex_literal(&addr.to_literal()).unwrap(),
            addr
        );
    }

    #[test]
    fn test_names_map_to_distinct_addresses() {
        assert_ne!(
            AccountAddress::from_name("alice"),
            AccountAddress::from_name("bob")
        );
    }

    #[test]
    fn test_invalid_literals() {
        assert!(matches!(
            AccountAddress::from_hex_literal("1234"),
            Err(AddressParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            AccountAddress::from_hex_literal("0xzz"),
            Err(AddressParseError::InvalidHex(_))
        ));
        let long = format!("0x{}", "1".repeat(65));
        assert!(matches!(
            AccountAddress::from_hex_literal(&long),
            Err(AddressParseError::TooLong(_))
        ));
    }
}

//! Fixed-width 32-byte digests
//!
//! Every hash the anchor stack touches (block hashes, state roots,
//! transaction identifiers, lock script code hashes) is exactly 32
//! bytes. Construction from a slice is fallible; there is no silent
//! truncation or padding path.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced by fixed-width field construction and binary decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("input truncated: {context}")]
    Truncated { context: &'static str },

    #[error("{0} trailing bytes after decode")]
    TrailingBytes(usize),

    #[error("invalid hex digest: {0}")]
    InvalidHex(String),
}

/// A 32-byte digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    pub const LEN: usize = 32;

    /// The all-zero digest. Used as the "no prior anchor" sentinel.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build a digest from a slice, failing on any length mismatch.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| EncodingError::InvalidLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Parse a hex digest, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, EncodingError> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| EncodingError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<blake3::Hash> for Digest {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

// Hex strings over JSON and friends; raw bytes stay on the borsh path.
impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = Digest::from_slice(&[1u8; 31]).unwrap_err();
        assert_eq!(
            err,
            EncodingError::InvalidLength {
                expected: 32,
                actual: 31
            }
        );
        assert!(Digest::from_slice(&[1u8; 33]).is_err());
        assert!(Digest::from_slice(&[1u8; 32]).is_ok());
    }

    #[test]
    fn test_hex_round_trip() {
        let digest = Digest::new([0xab; 32]);
        let parsed = Digest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(digest, parsed);

        // also accepted without the 0x prefix
        let bare = hex::encode([0xab; 32]);
        assert_eq!(Digest::from_hex(&bare).unwrap(), digest);
    }

    #[test]
    fn test_zero_sentinel() {
        assert!(Digest::zero().is_zero());
        assert!(!Digest::new([1u8; 32]).is_zero());
    }
}

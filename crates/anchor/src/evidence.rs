//! Evidence codec
//!
//! Canonical binary layout for block summaries and per-epoch bundles.
//! The layout is fixed-width and self-describing:
//!
//! ```text
//! summary := block_hash[32] || height(u64 LE) || state_root[32] || txn_root[32]
//! bundle  := count(u32 LE) || summary*
//! ```
//!
//! Encoding is pure and injective over valid inputs; the digest newtype
//! makes malformed fixed-size fields unrepresentable, so only decoding
//! can fail. Decoding exists for the round-trip law and tests; the
//! submission path itself only encodes.

use l1_types::{Digest, EncodingError};

use crate::types::BlockSummary;

/// Encoded size of one block summary
pub const SUMMARY_LEN: usize = 32 + 8 + 32 + 32;

/// Encode one block summary into its 104-byte canonical form.
pub fn encode_summary(summary: &BlockSummary) -> Vec<u8> {
    let mut out = Vec::with_capacity(SUMMARY_LEN);
    out.extend_from_slice(summary.block_hash.as_bytes());
    out.extend_from_slice(&summary.height.to_le_bytes());
    out.extend_from_slice(summary.state_root.as_bytes());
    out.extend_from_slice(summary.txn_root.as_bytes());
    out
}

/// Encode an ordered bundle of summaries with a count prefix.
pub fn encode_bundle(bundle: &[BlockSummary]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + bundle.len() * SUMMARY_LEN);
    out.extend_from_slice(&(bundle.len() as u32).to_le_bytes());
    for summary in bundle {
        out.extend_from_slice(&encode_summary(summary));
    }
    out
}

/// Decode one summary from exactly [`SUMMARY_LEN`] bytes.
pub fn decode_summary(bytes: &[u8]) -> Result<BlockSummary, EncodingError> {
    if bytes.len() != SUMMARY_LEN {
        return Err(EncodingError::InvalidLength {
            expected: SUMMARY_LEN,
            actual: bytes.len(),
        });
    }
    let height_bytes: [u8; 8] = bytes[32..40]
        .try_into()
        .expect("slice bounds are fixed above");
    Ok(BlockSummary {
        block_hash: Digest::from_slice(&bytes[..32])?,
        height: u64::from_le_bytes(height_bytes),
        state_root: Digest::from_slice(&bytes[40..72])?,
        txn_root: Digest::from_slice(&bytes[72..104])?,
    })
}

/// Decode a bundle, rejecting truncated input and trailing bytes.
pub fn decode_bundle(bytes: &[u8]) -> Result<Vec<BlockSummary>, EncodingError> {
    if bytes.len() < 4 {
        return Err(EncodingError::Truncated {
            context: "bundle count prefix",
        });
    }
    let count_bytes: [u8; 4] = bytes[..4].try_into().expect("length checked above");
    let count = u32::from_le_bytes(count_bytes) as usize;

    let body = &bytes[4..];
    let expected = count * SUMMARY_LEN;
    if body.len() < expected {
        return Err(EncodingError::Truncated {
            context: "bundle body",
        });
    }
    if body.len() > expected {
        return Err(EncodingError::TrailingBytes(body.len() - expected));
    }

    let mut bundle = Vec::with_capacity(count);
    for chunk in body.chunks_exact(SUMMARY_LEN) {
        bundle.push(decode_summary(chunk)?);
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(height: u64) -> BlockSummary {
        let tag = |prefix: u8| {
            let mut bytes = [0u8; 32];
            bytes[0] = prefix;
            bytes[1..9].copy_from_slice(&height.to_le_bytes());
            Digest::new(bytes)
        };
        BlockSummary {
            block_hash: tag(1),
            height,
            state_root: tag(2),
            txn_root: tag(3),
        }
    }

    #[test]
    fn test_summary_layout() {
        let encoded = encode_summary(&summary(300));
        assert_eq!(encoded.len(), SUMMARY_LEN);
        // full 64-bit little-endian height at offset 32
        assert_eq!(&encoded[32..40], &300u64.to_le_bytes());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let bundle: Vec<_> = (10..20).map(summary).collect();
        assert_eq!(encode_bundle(&bundle), encode_bundle(&bundle));
    }

    #[test]
    fn test_encoding_is_injective() {
        let base: Vec<_> = (0..3).map(summary).collect();
        let encoded = encode_bundle(&base);

        let mut changed = base.clone();
        changed[1].height += 1;
        assert_ne!(encoded, encode_bundle(&changed));

        let mut changed = base.clone();
        changed[2].txn_root = Digest::new([0xee; 32]);
        assert_ne!(encoded, encode_bundle(&changed));

        // differing lengths differ even when the shared prefix matches
        assert_ne!(encoded, encode_bundle(&base[..2]));
    }

    #[test]
    fn test_bundle_round_trip() {
        let bundle: Vec<_> = (100..110).map(summary).collect();
        let decoded = decode_bundle(&encode_bundle(&bundle)).unwrap();
        assert_eq!(bundle, decoded);

        assert_eq!(decode_bundle(&encode_bundle(&[])).unwrap(), vec![]);
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let encoded = encode_bundle(&[summary(5), summary(6)]);
        assert!(matches!(
            decode_bundle(&encoded[..encoded.len() - 1]),
            Err(EncodingError::Truncated { .. })
        ));
        assert!(matches!(
            decode_bundle(&[1, 0]),
            Err(EncodingError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut encoded = encode_bundle(&[summary(5)]);
        encoded.push(0);
        assert_eq!(decode_bundle(&encoded), Err(EncodingError::TrailingBytes(1)));
    }

    #[test]
    fn test_decode_summary_rejects_wrong_length() {
        assert!(decode_summary(&[0u8; SUMMARY_LEN - 1]).is_err());
        assert!(decode_summary(&[0u8; SUMMARY_LEN + 1]).is_err());
    }
}

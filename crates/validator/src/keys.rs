//! Deterministic development keypairs
//!
//! Every node derives the same validator set from indices alone, so a
//! local cluster needs no key distribution. Not for production keys.

use anchor_protocol::{ValidatorInfo, ValidatorSet};
use ed25519_dalek::SigningKey;

/// Signing key for a validator index.
pub fn dev_signing_key(index: usize) -> SigningKey {
    let seed = blake3::hash(format!("anchor-dev-validator-{index}").as_bytes());
    SigningKey::from_bytes(seed.as_bytes())
}

/// The full validator set for a cluster with the given peer addresses.
pub fn dev_validator_set(addrs: &[String]) -> ValidatorSet {
    ValidatorSet::new(
        addrs
            .iter()
            .enumerate()
            .map(|(index, addr)| ValidatorInfo {
                key: dev_signing_key(index).verifying_key(),
                addr: addr.clone(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic_and_distinct() {
        assert_eq!(
            dev_signing_key(2).to_bytes(),
            dev_signing_key(2).to_bytes()
        );
        assert_ne!(
            dev_signing_key(0).verifying_key(),
            dev_signing_key(1).verifying_key()
        );
    }

    #[test]
    fn test_set_order_follows_addresses() {
        let addrs: Vec<_> = (0..3).map(|i| format!("127.0.0.1:910{i}")).collect();
        let set = dev_validator_set(&addrs);
        assert_eq!(set.len(), 3);
        assert_eq!(set.index_of(&dev_signing_key(1).verifying_key()), Some(1));
        assert_eq!(set.get(2).unwrap().addr, addrs[2]);
    }
}

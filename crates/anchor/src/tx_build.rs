//! Multisig anchor transaction assembly
//!
//! Builds the unsigned transaction skeleton for a turn (sole input
//! chained to the previous turn's anchor, single multisig-locked output
//! carrying the encoded evidence bundle) and derives the signing
//! message every validator must sign. No signing, no network I/O; pure
//! given its inputs plus one chain-state read.

use ed25519_dalek::VerifyingKey;
use l1_types::{Digest, OutPoint, Script, Transaction, TxInput, TxOutput};

use crate::error::AnchorError;
use crate::store::AnchorStore;
use crate::types::{SignatureShare, ValidatorSet};

/// Raw ed25519 signature length
pub const SIGNATURE_LEN: usize = 64;

/// Fixed capacity overhead on top of the bundle length. Exact sizing is
/// the ledger's concern; the assembler must never under-allocate.
pub const ANCHOR_CAPACITY_OVERHEAD: u64 = 256;

/// M-of-N multisig lock over the validator set, M = N - 1
#[derive(Debug, Clone)]
pub struct MultisigScript {
    threshold: usize,
    keys: Vec<VerifyingKey>,
}

impl MultisigScript {
    pub fn new(set: &ValidatorSet) -> Self {
        Self {
            threshold: set.threshold(),
            keys: set.keys(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Canonical serialization: `threshold || n || key0 || key1 || ...`
    pub fn serialized(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.keys.len() * 32);
        out.push(self.threshold as u8);
        out.push(self.keys.len() as u8);
        for key in &self.keys {
            out.extend_from_slice(key.as_bytes());
        }
        out
    }

    /// Lock script args: digest of the serialized multisig script.
    pub fn lock_args(&self) -> Vec<u8> {
        blake3::hash(&self.serialized()).as_bytes().to_vec()
    }

    /// Witness placeholder sized for the final witness: script
    /// serialization followed by room for `threshold` signatures.
    pub fn witness_placeholder(&self) -> Vec<u8> {
        let mut out = self.serialized();
        out.extend(std::iter::repeat(0u8).take(self.threshold * SIGNATURE_LEN));
        out
    }
}

/// An assembled but unsigned anchor transaction
#[derive(Debug, Clone)]
pub struct UnsignedAnchorTx {
    pub turn: u64,
    pub tx: Transaction,
    /// The exact bytes every validator signs for this turn
    pub signing_message: [u8; 32],
}

/// Assembles anchor transactions for successive turns
pub struct AnchorTxBuilder {
    multisig: MultisigScript,
    multisig_code_hash: Digest,
    genesis_anchor: Digest,
}

impl AnchorTxBuilder {
    /// `genesis_anchor` is the configured input reference for turn 0; an
    /// all-zero digest means "no prior anchor".
    pub fn new(multisig: MultisigScript, multisig_code_hash: Digest, genesis_anchor: Digest) -> Self {
        Self {
            multisig,
            multisig_code_hash,
            genesis_anchor,
        }
    }

    pub fn multisig(&self) -> &MultisigScript {
        &self.multisig
    }

    /// Resolve the input reference for a turn: the configured genesis
    /// anchor for turn 0, otherwise the previous turn's recorded hash.
    fn input_reference(&self, turn: u64, store: &AnchorStore) -> Result<Digest, AnchorError> {
        if turn == 0 {
            return Ok(self.genesis_anchor);
        }
        match store.get(turn - 1)? {
            Some(record) => Ok(record.tx_hash),
            None => Err(AnchorError::MissingPriorAnchor { turn }),
        }
    }

    /// Build the unsigned skeleton and derive its signing message.
    pub fn build_unsigned(
        &self,
        turn: u64,
        store: &AnchorStore,
        bundle: &[u8],
    ) -> Result<UnsignedAnchorTx, AnchorError> {
        let prev = self.input_reference(turn, store)?;
        let tx = Transaction {
            inputs: vec![TxInput {
                previous_output: OutPoint {
                    tx_hash: prev,
                    index: 0,
                },
            }],
            outputs: vec![TxOutput {
                capacity: bundle.len() as u64 + ANCHOR_CAPACITY_OVERHEAD,
                lock: Script {
                    code_hash: self.multisig_code_hash,
                    args: self.multisig.lock_args(),
                },
            }],
            outputs_data: vec![bundle.to_vec()],
            witnesses: vec![self.multisig.witness_placeholder()],
        };
        let signing_message = self.signing_message(&tx);
        Ok(UnsignedAnchorTx {
            turn,
            tx,
            signing_message,
        })
    }

    /// Derive the signing message from transaction content alone, so
    /// every validator computes the same bytes from the same skeleton:
    /// skeleton || input group || witness placeholder || multisig script.
    fn signing_message(&self, tx: &Transaction) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&tx.skeleton_bytes());
        hasher.update(&0u32.to_le_bytes());
        hasher.update(&self.multisig.witness_placeholder());
        hasher.update(&self.multisig.serialized());
        *hasher.finalize().as_bytes()
    }

    /// Attach collected shares as the multisig witness.
    ///
    /// Shares must arrive in validator-set order with at least the
    /// threshold count, and each must verify against its validator's key
    /// over this turn's signing message.
    pub fn finalize(
        &self,
        unsigned: UnsignedAnchorTx,
        shares: &[SignatureShare],
    ) -> Result<Transaction, AnchorError> {
        if shares.len() < self.multisig.threshold {
            return Err(AnchorError::SignatureOrder(format!(
                "{} shares, threshold {}",
                shares.len(),
                self.multisig.threshold
            )));
        }
        for pair in shares.windows(2) {
            if pair[0].validator_index >= pair[1].validator_index {
                return Err(AnchorError::SignatureOrder(
                    "shares out of validator-set order".to_string(),
                ));
            }
        }
        for share in shares {
            let key = self.multisig.keys.get(share.validator_index).ok_or_else(|| {
                AnchorError::SignatureOrder(format!(
                    "share for unknown validator index {}",
                    share.validator_index
                ))
            })?;
            key.verify_strict(&unsigned.signing_message, &share.signature)
                .map_err(|_| {
                    AnchorError::SignatureOrder(format!(
                        "share from validator {} does not verify",
                        share.validator_index
                    ))
                })?;
        }

        let mut witness = self.multisig.serialized();
        for share in shares {
            witness.extend_from_slice(&share.signature.to_bytes());
        }
        let mut tx = unsigned.tx;
        tx.witnesses = vec![witness];
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ed25519_dalek::{Signer, SigningKey};

    use super::*;
    use crate::store::MemStore;
    use crate::types::{AnchorRecord, ValidatorInfo};

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn validator_set(n: u8) -> ValidatorSet {
        ValidatorSet::new(
            (0..n)
                .map(|i| ValidatorInfo {
                    key: signing_key(i).verifying_key(),
                    addr: format!("127.0.0.1:91{i:02}"),
                })
                .collect(),
        )
    }

    fn builder(n: u8) -> AnchorTxBuilder {
        AnchorTxBuilder::new(
            MultisigScript::new(&validator_set(n)),
            Digest::new([0xcd; 32]),
            Digest::zero(),
        )
    }

    fn empty_store() -> AnchorStore {
        AnchorStore::new(Arc::new(MemStore::new()))
    }

    fn sign_all(unsigned: &UnsignedAnchorTx, seeds: &[u8]) -> Vec<SignatureShare> {
        seeds
            .iter()
            .map(|&seed| SignatureShare {
                validator_index: seed as usize,
                signature: signing_key(seed).sign(&unsigned.signing_message),
            })
            .collect()
    }

    #[test]
    fn test_turn_zero_uses_genesis_reference() {
        let genesis = Digest::new([0x11; 32]);
        let builder = AnchorTxBuilder::new(
            MultisigScript::new(&validator_set(3)),
            Digest::new([0xcd; 32]),
            genesis,
        );
        let unsigned = builder.build_unsigned(0, &empty_store(), b"data").unwrap();
        assert_eq!(unsigned.tx.inputs[0].previous_output.tx_hash, genesis);
    }

    #[test]
    fn test_turn_one_chains_to_recorded_anchor() {
        let store = empty_store();
        let prior = Digest::new([0x42; 32]);
        store
            .set(
                0,
                &AnchorRecord {
                    tx_hash: prior,
                    submitted_at: 0,
                },
            )
            .unwrap();

        let unsigned = builder(3).build_unsigned(1, &store, b"data").unwrap();
        assert_eq!(unsigned.tx.inputs[0].previous_output.tx_hash, prior);
    }

    #[test]
    fn test_turn_one_without_prior_anchor_fails() {
        let err = builder(3)
            .build_unsigned(1, &empty_store(), b"data")
            .unwrap_err();
        assert!(matches!(err, AnchorError::MissingPriorAnchor { turn: 1 }));
    }

    #[test]
    fn test_signing_message_is_content_derived() {
        let builder = builder(3);
        let store = empty_store();
        let a = builder.build_unsigned(0, &store, b"bundle").unwrap();
        let b = builder.build_unsigned(0, &store, b"bundle").unwrap();
        assert_eq!(a.signing_message, b.signing_message);

        let c = builder.build_unsigned(0, &store, b"bundlf").unwrap();
        assert_ne!(a.signing_message, c.signing_message);
    }

    #[test]
    fn test_capacity_covers_data() {
        let bundle = vec![0u8; 1040];
        let unsigned = builder(3).build_unsigned(0, &empty_store(), &bundle).unwrap();
        assert!(unsigned.tx.outputs[0].capacity >= bundle.len() as u64);
        assert_eq!(unsigned.tx.outputs_data[0], bundle);
    }

    #[test]
    fn test_finalize_accepts_threshold_shares_in_order() {
        let builder = builder(3);
        let unsigned = builder.build_unsigned(0, &empty_store(), b"data").unwrap();

        // validator 1 absent: still at threshold (2 of 3)
        let shares = sign_all(&unsigned, &[0, 2]);
        let tx = builder.finalize(unsigned, &shares).unwrap();

        let script_len = builder.multisig().serialized().len();
        assert_eq!(tx.witnesses[0].len(), script_len + 2 * SIGNATURE_LEN);
    }

    #[test]
    fn test_finalize_rejects_below_threshold() {
        let builder = builder(3);
        let unsigned = builder.build_unsigned(0, &empty_store(), b"data").unwrap();
        let shares = sign_all(&unsigned, &[0]);
        assert!(matches!(
            builder.finalize(unsigned, &shares),
            Err(AnchorError::SignatureOrder(_))
        ));
    }

    #[test]
    fn test_finalize_rejects_misordered_shares() {
        let builder = builder(3);
        let unsigned = builder.build_unsigned(0, &empty_store(), b"data").unwrap();
        let mut shares = sign_all(&unsigned, &[0, 1, 2]);
        shares.swap(0, 2);
        assert!(matches!(
            builder.finalize(unsigned, &shares),
            Err(AnchorError::SignatureOrder(_))
        ));
    }

    #[test]
    fn test_finalize_rejects_wrong_signature() {
        let builder = builder(3);
        let unsigned = builder.build_unsigned(0, &empty_store(), b"data").unwrap();
        let mut shares = sign_all(&unsigned, &[0, 1, 2]);
        // validator 1's slot carries a signature from the wrong key
        shares[1].signature = signing_key(7).sign(&unsigned.signing_message);
        assert!(matches!(
            builder.finalize(unsigned, &shares),
            Err(AnchorError::SignatureOrder(_))
        ));
    }
}

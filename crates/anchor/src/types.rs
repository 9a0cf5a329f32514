//! Core types for the anchoring protocol

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signature, VerifyingKey};
use l1_types::Digest;
use serde::{Deserialize, Serialize};

/// Protocol tag for signature requests on the peer channel
pub const SIGN_PROTOCOL: &str = "/anchor/sign/1";

/// Immutable snapshot of one sidechain block, taken when its epoch closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockSummary {
    pub block_hash: Digest,
    pub height: u64,
    pub state_root: Digest,
    pub txn_root: Digest,
}

/// One validator: signing identity plus peer address
#[derive(Debug, Clone)]
pub struct ValidatorInfo {
    pub key: VerifyingKey,
    pub addr: String,
}

/// Ordered validator set, fixed for the protocol's lifetime
///
/// The set order is the multisig script order; signature shares must be
/// arranged to match it before finalization.
#[derive(Debug, Clone)]
pub struct ValidatorSet {
    validators: Vec<ValidatorInfo>,
}

impl ValidatorSet {
    pub fn new(validators: Vec<ValidatorInfo>) -> Self {
        Self { validators }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Required signature count: N-of-N minus one, tolerating exactly
    /// one absent signer.
    pub fn threshold(&self) -> usize {
        self.validators.len().saturating_sub(1)
    }

    pub fn index_of(&self, key: &VerifyingKey) -> Option<usize> {
        self.validators.iter().position(|v| &v.key == key)
    }

    pub fn get(&self, index: usize) -> Option<&ValidatorInfo> {
        self.validators.get(index)
    }

    pub fn validators(&self) -> &[ValidatorInfo] {
        &self.validators
    }

    pub fn keys(&self) -> Vec<VerifyingKey> {
        self.validators.iter().map(|v| v.key).collect()
    }
}

/// One validator's signature over a turn's signing message
#[derive(Debug, Clone, Copy)]
pub struct SignatureShare {
    /// Position of the signer in the validator set
    pub validator_index: usize,
    pub signature: Signature,
}

/// Messages exchanged on the sign-request protocol
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub enum PeerMessage {
    /// Leader asking a validator to sign a turn's message
    SignRequest { turn: u64, message: [u8; 32] },

    /// Validator returning its raw signature
    SignResponse { signature: Vec<u8> },

    /// Validator declining to sign
    Rejected { reason: String },
}

impl PeerMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("PeerMessage serialization should not fail")
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(data)
    }
}

/// Persisted record of one turn's successful anchor submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Ledger-observed transaction identifier
    pub tx_hash: Digest,
    /// Unix timestamp of the submission
    pub submitted_at: i64,
}

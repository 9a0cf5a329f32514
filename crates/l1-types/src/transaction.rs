//! Ledger transaction structures
//!
//! Opaque to the ledger itself; the anchor stack only needs to build a
//! skeleton, derive its identity hash, and attach witnesses. Witnesses
//! are excluded from the skeleton so the transaction hash is stable
//! across signing.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Reference to an output of a previous transaction
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_hash: Digest,
    pub index: u32,
}

/// A transaction input
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TxInput {
    pub previous_output: OutPoint,
}

/// A locking script: code hash plus arguments
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Script {
    pub code_hash: Digest,
    pub args: Vec<u8>,
}

/// A transaction output. Capacity must cover the attached output data.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TxOutput {
    pub capacity: u64,
    pub lock: Script,
}

/// A ledger transaction
///
/// Output data is carried parallel to outputs; witnesses are filled in
/// at finalization and never contribute to the transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub outputs_data: Vec<Vec<u8>>,
    pub witnesses: Vec<Vec<u8>>,
}

impl Transaction {
    /// Serialize everything except the witnesses.
    pub fn skeleton_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        BorshSerialize::serialize(&self.inputs, &mut out)
            .expect("input serialization should not fail");
        BorshSerialize::serialize(&self.outputs, &mut out)
            .expect("output serialization should not fail");
        BorshSerialize::serialize(&self.outputs_data, &mut out)
            .expect("output data serialization should not fail");
        out
    }

    /// Transaction identity: blake3 over the skeleton.
    pub fn hash(&self) -> Digest {
        blake3::hash(&self.skeleton_bytes()).into()
    }

    /// Serialize for submission / transport.
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("transaction serialization should not fail")
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(data)
    }
}

/// System scripts looked up from the ledger during template construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemScripts {
    /// Code hash of the ledger's M-of-N multisig lock
    pub multisig_code_hash: Digest,
}

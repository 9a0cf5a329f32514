//! Host chain block types

use anchor_protocol::BlockSummary;
use borsh::{BorshDeserialize, BorshSerialize};
use l1_types::Digest;

/// Per-block data delivered by the host chain's lifecycle hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CompactBlock {
    pub height: u64,
    pub hash: Digest,
    pub state_root: Digest,
    pub txn_root: Digest,
}

impl CompactBlock {
    /// Snapshot this block for inclusion in an evidence bundle.
    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            block_hash: self.hash,
            height: self.height,
            state_root: self.state_root,
            txn_root: self.txn_root,
        }
    }
}

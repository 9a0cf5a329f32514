//! Development block feed
//!
//! Stands in for the host chain runtime in local clusters: produces one
//! deterministic block per tick, so every node observes the same chain
//! and the anchoring pipeline can be exercised end to end. Leader
//! election rotates round-robin by turn, the PoA rotation of the
//! anchored sidechain.

use anchor_protocol::EpochSchedule;
use l1_types::Digest;
use parking_lot::RwLock;
use sidechain_runtime::{BlockSource, CompactBlock, LeaderOracle};

fn block_digest(domain: &str, height: u64) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    hasher.update(&height.to_le_bytes());
    hasher.finalize().into()
}

fn make_block(height: u64) -> CompactBlock {
    CompactBlock {
        height,
        hash: block_digest("block", height),
        state_root: block_digest("state", height),
        txn_root: block_digest("txn", height),
    }
}

/// In-process chain of deterministic blocks
pub struct DevChain {
    blocks: RwLock<Vec<CompactBlock>>,
}

impl DevChain {
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(vec![make_block(0)]),
        }
    }

    /// Produce and return the next block.
    pub fn produce_next(&self) -> CompactBlock {
        let mut blocks = self.blocks.write();
        let block = make_block(blocks.len() as u64);
        blocks.push(block);
        block
    }

    pub fn tip(&self) -> CompactBlock {
        *self.blocks.read().last().expect("chain seeded with genesis")
    }
}

impl Default for DevChain {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSource for DevChain {
    fn get_genesis(&self) -> anyhow::Result<CompactBlock> {
        Ok(self.blocks.read()[0])
    }

    fn get_range_blocks(&self, from: u64, to: u64) -> anyhow::Result<Vec<CompactBlock>> {
        let blocks = self.blocks.read();
        if to >= blocks.len() as u64 {
            anyhow::bail!("height {to} not produced yet");
        }
        Ok(blocks[from as usize..=to as usize].to_vec())
    }
}

/// Round-robin leader rotation over the validator set, one leader per
/// turn
pub struct RoundRobinLeader {
    schedule: EpochSchedule,
    index: usize,
    total: usize,
}

impl RoundRobinLeader {
    pub fn new(schedule: EpochSchedule, index: usize, total: usize) -> Self {
        Self {
            schedule,
            index,
            total,
        }
    }
}

impl LeaderOracle for RoundRobinLeader {
    fn am_i_leader(&self, height: u64) -> bool {
        (self.schedule.turn_of(height) as usize) % self.total == self.index
    }
}

//! Capabilities consumed from the host chain
//!
//! The host runtime, leader election, and block storage are external
//! collaborators; the adapter sees them only through these traits.

use async_trait::async_trait;

use crate::types::CompactBlock;

/// Read access to the host chain's finalized blocks
pub trait BlockSource: Send + Sync {
    fn get_genesis(&self) -> anyhow::Result<CompactBlock>;

    /// Blocks for the inclusive height range, ordered by ascending
    /// height.
    fn get_range_blocks(&self, from: u64, to: u64) -> anyhow::Result<Vec<CompactBlock>>;
}

/// Leader-election result for a given height
pub trait LeaderOracle: Send + Sync {
    fn am_i_leader(&self, height: u64) -> bool;
}

/// Per-block lifecycle hooks invoked by the host, one block at a time
///
/// The host guarantees sequential delivery: one height's hooks complete
/// before the next height's begin, so epoch submissions never overlap.
#[async_trait]
pub trait ChainLifecycle: Send + Sync {
    async fn on_chain_init(&self) -> anyhow::Result<()>;

    async fn on_block_start(&self, block: &CompactBlock) -> anyhow::Result<()>;

    async fn on_block_end(&self, block: &CompactBlock) -> anyhow::Result<()>;

    async fn on_block_finalize(&self, block: &CompactBlock) -> anyhow::Result<()>;
}

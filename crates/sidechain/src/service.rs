//! Anchor lifecycle service
//!
//! Implements the host lifecycle hooks. Most heights are a no-op; at an
//! epoch-closing height the elected leader runs the submission pipeline.
//! Anchor failures are logged and swallowed; they must never abort the
//! host's block processing, and a failed turn simply leaves no record
//! for later turns to chain from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anchor_protocol::{
    encode_bundle, AnchorRecord, AnchorStore, AnchorTxBuilder, EpochSchedule, SignatureCollector,
};
use anyhow::bail;
use async_trait::async_trait;
use l1_client::LedgerClient;
use l1_types::Digest;

use crate::traits::{BlockSource, ChainLifecycle, LeaderOracle};
use crate::types::CompactBlock;

/// Lifecycle adapter wiring the anchoring pipeline into host callbacks
pub struct AnchorService {
    schedule: EpochSchedule,
    builder: AnchorTxBuilder,
    collector: SignatureCollector,
    store: AnchorStore,
    blocks: Arc<dyn BlockSource>,
    leader: Arc<dyn LeaderOracle>,
    ledger: Arc<dyn LedgerClient>,
    /// Highest finalized height seen; shared with the sign-request
    /// handler for its plausibility guard.
    observed_tip: Arc<AtomicU64>,
    genesis_height: AtomicU64,
}

impl AnchorService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schedule: EpochSchedule,
        builder: AnchorTxBuilder,
        collector: SignatureCollector,
        store: AnchorStore,
        blocks: Arc<dyn BlockSource>,
        leader: Arc<dyn LeaderOracle>,
        ledger: Arc<dyn LedgerClient>,
        observed_tip: Arc<AtomicU64>,
    ) -> Self {
        Self {
            schedule,
            builder,
            collector,
            store,
            blocks,
            leader,
            ledger,
            observed_tip,
            genesis_height: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &AnchorStore {
        &self.store
    }

    /// Run the full submission pipeline for the epoch closed by
    /// `height`. Leader-only; callers gate on the leader oracle.
    pub async fn submit_epoch(&self, height: u64) -> anyhow::Result<Digest> {
        let turn = self.schedule.turn_of(height);
        let (start, end) = self.schedule.turn_range(turn);
        // the first epoch may be shorter if genesis is not epoch-aligned
        let start = start.max(self.genesis_height.load(Ordering::Acquire));

        let blocks = self.blocks.get_range_blocks(start, end)?;
        if blocks.is_empty() {
            bail!("host returned no blocks for heights {start}..={end}");
        }
        let summaries: Vec<_> = blocks.iter().map(CompactBlock::summary).collect();
        for pair in summaries.windows(2) {
            if pair[1].height <= pair[0].height {
                bail!("host block range out of order at height {}", pair[1].height);
            }
        }

        let bundle = encode_bundle(&summaries);
        let unsigned = self.builder.build_unsigned(turn, &self.store, &bundle)?;
        tracing::debug!(
            turn,
            blocks = summaries.len(),
            message = %Digest::new(unsigned.signing_message),
            "anchor transaction assembled"
        );

        let shares = self.collector.collect(turn, unsigned.signing_message).await?;
        let tx = self.builder.finalize(unsigned, &shares)?;

        let tx_hash = self
            .ledger
            .send_transaction(&tx)
            .await
            .map_err(|e| anchor_protocol::AnchorError::Submission(format!("{e:#}")))?;

        self.store.set(
            turn,
            &AnchorRecord {
                tx_hash,
                submitted_at: chrono::Utc::now().timestamp(),
            },
        )?;
        tracing::info!(turn, tx_hash = %tx_hash, "anchor submitted");
        Ok(tx_hash)
    }
}

#[async_trait]
impl ChainLifecycle for AnchorService {
    async fn on_chain_init(&self) -> anyhow::Result<()> {
        let genesis = self.blocks.get_genesis()?;
        self.genesis_height.store(genesis.height, Ordering::Release);
        tracing::info!(height = genesis.height, hash = %genesis.hash, "chain initialized");
        Ok(())
    }

    async fn on_block_start(&self, _block: &CompactBlock) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_block_end(&self, _block: &CompactBlock) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_block_finalize(&self, block: &CompactBlock) -> anyhow::Result<()> {
        self.observed_tip.store(block.height, Ordering::Release);

        if !self.schedule.is_epoch_end(block.height) {
            return Ok(());
        }
        if !self.leader.am_i_leader(block.height) {
            tracing::debug!(height = block.height, "epoch closed, not leader");
            return Ok(());
        }

        let turn = self.schedule.turn_of(block.height);
        if let Err(e) = self.submit_epoch(block.height).await {
            // isolated to the anchoring side-effect; block processing continues
            tracing::error!(turn, height = block.height, "anchor submission failed: {e:#}");
        }
        Ok(())
    }
}

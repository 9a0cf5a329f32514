//! Node configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Anchor node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This validator's index in the set
    pub index: usize,
    /// Peer addresses for the whole validator set, in set order
    pub validator_addrs: Vec<String>,
    /// Ledger JSON-RPC endpoint; stub client when absent
    pub ledger_url: Option<String>,
    /// Hex transaction hash the turn-0 anchor spends (zero = none)
    pub genesis_anchor: String,
    /// Blocks per epoch
    pub epoch_length: u64,
    /// Dev chain block time in milliseconds
    pub block_time_ms: u64,
    /// Data directory for the anchor store
    pub data_dir: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            index: 0,
            validator_addrs: vec![
                "127.0.0.1:9100".to_string(),
                "127.0.0.1:9101".to_string(),
                "127.0.0.1:9102".to_string(),
            ],
            ledger_url: None,
            genesis_anchor: format!("0x{}", "00".repeat(32)),
            epoch_length: 10,
            block_time_ms: 1000,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl NodeConfig {
    /// The listen address for this validator's peer server.
    pub fn listen_addr(&self) -> anyhow::Result<&str> {
        self.validator_addrs
            .get(self.index)
            .map(String::as_str)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "validator index {} out of range for {} addresses",
                    self.index,
                    self.validator_addrs.len()
                )
            })
    }
}

//! Stub ledger client for local runs
//!
//! Accepts every transaction and reports the transaction's own hash as
//! the ledger identifier, so the chaining state machine can be exercised
//! without a ledger endpoint.

use async_trait::async_trait;
use l1_types::{Digest, SystemScripts, Transaction};

use crate::LedgerClient;

/// In-process ledger stand-in
pub struct StubLedgerClient {
    scripts: SystemScripts,
}

impl StubLedgerClient {
    pub fn new() -> Self {
        Self {
            scripts: SystemScripts {
                multisig_code_hash: blake3::hash(b"anchor-multisig-dev").into(),
            },
        }
    }
}

impl Default for StubLedgerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for StubLedgerClient {
    async fn send_transaction(&self, tx: &Transaction) -> anyhow::Result<Digest> {
        let tx_hash = tx.hash();
        tracing::info!(tx_hash = %tx_hash, "stub ledger accepted transaction");
        Ok(tx_hash)
    }

    async fn system_scripts(&self) -> anyhow::Result<SystemScripts> {
        Ok(self.scripts.clone())
    }
}

//! External ledger client
//!
//! The ledger is a collaborator, not something this stack owns: the
//! anchor pipeline needs exactly two capabilities from it: submit a
//! finalized transaction, and look up the system multisig script during
//! template construction. Both live behind [`LedgerClient`] so the
//! pipeline can run against a JSON-RPC endpoint or a local stub.

use async_trait::async_trait;
use l1_types::{Digest, SystemScripts, Transaction};

pub mod rpc;
pub mod stub;

pub use rpc::RpcLedgerClient;
pub use stub::StubLedgerClient;

/// Capabilities consumed from the external ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a finalized transaction; returns the ledger-observed
    /// transaction identifier.
    async fn send_transaction(&self, tx: &Transaction) -> anyhow::Result<Digest>;

    /// Fetch the system script descriptors used to build lock scripts.
    async fn system_scripts(&self) -> anyhow::Result<SystemScripts>;
}

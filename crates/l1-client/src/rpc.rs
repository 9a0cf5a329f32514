//! JSON-RPC ledger client

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use l1_types::{Digest, SystemScripts, Transaction};

use crate::LedgerClient;

/// Ledger client speaking JSON-RPC over HTTP
pub struct RpcLedgerClient {
    client: HttpClient,
    url: String,
}

impl RpcLedgerClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = HttpClientBuilder::default().build(url)?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn send_transaction(&self, tx: &Transaction) -> anyhow::Result<Digest> {
        let params = rpc_params![serde_json::to_value(tx)?];
        let tx_hash: String = self.client.request("send_transaction", params).await?;
        tracing::debug!(tx_hash = %tx_hash, "transaction accepted by ledger");
        Ok(Digest::from_hex(&tx_hash)?)
    }

    async fn system_scripts(&self) -> anyhow::Result<SystemScripts> {
        let scripts: SystemScripts = self
            .client
            .request("get_system_scripts", rpc_params![])
            .await?;
        Ok(scripts)
    }
}

//! Anchor validator node
//!
//! Runs one validator of the anchoring cluster. Every node answers
//! signature requests on its peer server; the node whose turn it is to
//! lead assembles and submits the epoch's anchor transaction. Block
//! lifecycle events come from an in-process dev chain so a local
//! cluster can be exercised without a host runtime.

use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use anchor_protocol::{
    AnchorStore, AnchorTxBuilder, EpochSchedule, MultisigScript, PeerServer, SignRequestHandler,
    SignatureCollector, SledStore, WsPeerChannel, SIGN_PROTOCOL,
};
use anyhow::Result;
use clap::Parser;
use l1_client::{LedgerClient, RpcLedgerClient, StubLedgerClient};
use l1_types::Digest;
use sidechain_runtime::{AnchorService, ChainLifecycle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod dev_chain;
mod keys;

use config::NodeConfig;
use dev_chain::{DevChain, RoundRobinLeader};

/// Sidechain anchor validator
#[derive(Parser, Debug)]
#[command(name = "anchor-node")]
#[command(about = "Anchors sidechain epochs onto an external ledger", long_about = None)]
struct Args {
    /// This validator's index in the set
    #[arg(long, default_value = "0")]
    index: usize,

    /// Peer addresses for the whole validator set, in set order
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "127.0.0.1:9100,127.0.0.1:9101,127.0.0.1:9102"
    )]
    validator_addrs: Vec<String>,

    /// Transaction hash the turn-0 anchor spends (hex, all-zero for none)
    #[arg(
        long,
        default_value = "0x0000000000000000000000000000000000000000000000000000000000000000"
    )]
    genesis_anchor: String,

    /// Ledger JSON-RPC endpoint (stub ledger when omitted)
    #[arg(long)]
    ledger_url: Option<String>,

    /// Blocks per epoch
    #[arg(long, default_value = "10")]
    epoch_length: u64,

    /// Dev chain block time in milliseconds
    #[arg(long, default_value = "1000")]
    block_time_ms: u64,

    /// Data directory for persistent state
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> NodeConfig {
        NodeConfig {
            index: self.index,
            validator_addrs: self.validator_addrs,
            ledger_url: self.ledger_url,
            genesis_anchor: self.genesis_anchor,
            epoch_length: self.epoch_length,
            block_time_ms: self.block_time_ms,
            data_dir: self.data_dir,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    run(args.into_config()).await
}

async fn run(config: NodeConfig) -> Result<()> {
    tracing::info!("Starting anchor validator {}", config.index);
    tracing::info!("  Validator set: {:?}", config.validator_addrs);
    tracing::info!("  Epoch length: {} blocks", config.epoch_length);
    tracing::info!("  Data directory: {:?}", config.data_dir);

    std::fs::create_dir_all(&config.data_dir)?;

    let signing_key = keys::dev_signing_key(config.index);
    let set = keys::dev_validator_set(&config.validator_addrs);

    let ledger: Arc<dyn LedgerClient> = match &config.ledger_url {
        Some(url) => {
            tracing::info!("  Ledger endpoint: {}", url);
            Arc::new(RpcLedgerClient::new(url)?)
        }
        None => {
            tracing::info!("  Ledger endpoint: none (stub client)");
            Arc::new(StubLedgerClient::new())
        }
    };
    let system_scripts = ledger.system_scripts().await?;

    let schedule = EpochSchedule::new(config.epoch_length);
    let observed_tip = Arc::new(AtomicU64::new(0));

    // Responder role: every node signs for whichever peer leads the turn
    let server = PeerServer::new();
    server.register(
        SIGN_PROTOCOL,
        Arc::new(SignRequestHandler::new(
            signing_key.clone(),
            schedule,
            observed_tip.clone(),
        )),
    );
    server.start(config.listen_addr()?).await?;

    let store_path = config.data_dir.join(format!("validator-{}", config.index));
    let store = AnchorStore::new(Arc::new(SledStore::open(store_path)?));
    let builder = AnchorTxBuilder::new(
        MultisigScript::new(&set),
        system_scripts.multisig_code_hash,
        Digest::from_hex(&config.genesis_anchor)?,
    );
    let collector = SignatureCollector::new(signing_key, set.clone(), Arc::new(WsPeerChannel::new()))?;

    let chain = Arc::new(DevChain::new());
    let leader = Arc::new(RoundRobinLeader::new(schedule, config.index, set.len()));

    let service = AnchorService::new(
        schedule,
        builder,
        collector,
        store,
        chain.clone(),
        leader,
        ledger,
        observed_tip,
    );

    service.on_chain_init().await?;
    tracing::info!("Anchor validator running. Press Ctrl+C to stop.");

    let mut ticker = tokio::time::interval(Duration::from_millis(config.block_time_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let block = chain.produce_next();
                service.on_block_start(&block).await?;
                service.on_block_end(&block).await?;
                service.on_block_finalize(&block).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

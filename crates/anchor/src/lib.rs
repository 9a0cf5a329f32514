//! Anchor protocol - epoch evidence anchored to an external ledger
//!
//! Architecture:
//! - Each epoch ("turn") of sidechain blocks is summarized into a
//!   deterministic evidence bundle
//! - The epoch leader assembles a multisig transaction chained to the
//!   previous turn's anchor and derives its signing message
//! - Signature shares are collected from every validator over a
//!   point-to-point request/response channel
//! - The finalized transaction is submitted and its hash recorded per
//!   turn, so the next turn can reference it

pub mod collector;
pub mod error;
pub mod evidence;
pub mod net;
pub mod schedule;
pub mod store;
pub mod tx_build;
pub mod types;

pub use collector::{SignRequestHandler, SignatureCollector};
pub use error::AnchorError;
pub use evidence::{decode_bundle, decode_summary, encode_bundle, encode_summary};
pub use net::{PeerChannel, PeerServer, RequestHandler, WsPeerChannel};
pub use schedule::{EpochSchedule, DEFAULT_EPOCH_LENGTH};
pub use store::{AnchorStore, KVStore, MemStore, SledStore};
pub use tx_build::{AnchorTxBuilder, MultisigScript, UnsignedAnchorTx};
pub use types::{
    AnchorRecord, BlockSummary, PeerMessage, SignatureShare, ValidatorInfo, ValidatorSet,
    SIGN_PROTOCOL,
};

//! Sidechain runtime adapter
//!
//! Bridges the host chain's per-block lifecycle callbacks into the
//! anchoring protocol: at each epoch-closing height, the elected leader
//! bundles the epoch's block summaries, collects validator signatures,
//! submits the anchor transaction, and records its hash for the next
//! turn. Everything the adapter needs from its surroundings is injected
//! as a capability trait.

pub mod service;
pub mod traits;
pub mod types;

pub use service::AnchorService;
pub use traits::{BlockSource, ChainLifecycle, LeaderOracle};
pub use types::CompactBlock;

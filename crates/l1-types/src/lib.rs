//! Shared Layer-1 types for the anchor stack
//!
//! The external ledger's transaction and script formats are its own
//! contract; this crate carries just enough structure to assemble,
//! hash, and submit anchor transactions:
//! - Fixed 32-byte digests with fallible construction
//! - Transaction skeletons (inputs, outputs, output data, witnesses)
//! - System script descriptors used during template construction

pub mod digest;
pub mod transaction;

pub use digest::{Digest, EncodingError};
pub use transaction::{OutPoint, Script, SystemScripts, Transaction, TxInput, TxOutput};

//! Anchor protocol errors
//!
//! All failures are local to one epoch's submission attempt. The
//! chain-state tracker is only written after a successful submission, so
//! none of these corrupts chaining state; the affected epoch simply has
//! no anchor and later epochs proceed normally.

use l1_types::EncodingError;
use thiserror::Error;

/// Anchor submission errors
#[derive(Error, Debug)]
pub enum AnchorError {
    #[error("malformed fixed-size field: {0}")]
    Encoding(#[from] EncodingError),

    #[error("no anchor recorded for the prior turn (submitting turn {turn})")]
    MissingPriorAnchor { turn: u64 },

    #[error("signature collection failed, {missing} validators unreachable: {detail}")]
    SignatureCollection { missing: usize, detail: String },

    #[error("signature shares unusable: {0}")]
    SignatureOrder(String),

    #[error("ledger rejected anchor transaction: {0}")]
    Submission(String),

    #[error("chain state store failed: {0}")]
    ChainState(String),
}

//! Error taxonomy for the arbitrage pipeline.
//!
//! Two layers, matching where an error is handled:
//! - `EvalError`: local to a single evaluation. Rejects that evaluation only,
//!   never retried.
//! - `CycleError`: surfaced by collaborators (RPC quote fetch, gas estimation,
//!   transaction submission/confirmation). Caught at the per-pair cycle
//!   boundary, logged, and the pair resumes on the next tick. Never propagated
//!   to abort sibling pairs or the process.

use crate::types::Venue;
use alloy::primitives::TxHash;
use std::time::Duration;
use thiserror::Error;

/// Errors local to a single opportunity evaluation.
///
/// "Not profitable" is a normal negative decision, not an error — the
/// evaluator returns `Ok(None)` for that.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A quote was zero, negative, or in a different settlement asset
    /// than its counterpart. Never silently coerced to zero.
    #[error("invalid quote: {0}")]
    InvalidQuote(String),

    /// `min_profit_margin` or `slippage_tolerance` outside its valid range.
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),
}

/// Errors surfaced by collaborators during one monitoring cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("quote unavailable on {venue}: {reason}")]
    QuoteUnavailable { venue: Venue, reason: String },

    #[error("gas estimation failed: {0}")]
    EstimationFailed(String),

    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The transaction landed on-chain but reverted. Reported, never retried
    /// with adjusted parameters.
    #[error("transaction {0} reverted on-chain")]
    Reverted(TxHash),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

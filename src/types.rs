//! Core data structures for the arbitrage pipeline.

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two DEX venues we arbitrage between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Pancakeswap,
    Bakeryswap,
}

/// Both venues, in fixed order. The monitor tries each ordering of this
/// array as (buy, sell).
pub const VENUES: [Venue; 2] = [Venue::Pancakeswap, Venue::Bakeryswap];

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Venue::Pancakeswap => write!(f, "PancakeSwap"),
            Venue::Bakeryswap => write!(f, "BakerySwap"),
        }
    }
}

/// An unordered pair of two distinct tokens, as enumerated from the
/// factory registry. Immutable for the monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPair {
    pub token_a: Address,
    pub token_b: Address,
}

impl TokenPair {
    /// Returns `None` if both tokens are the same address.
    pub fn new(token_a: Address, token_b: Address) -> Option<Self> {
        if token_a == token_b {
            return None;
        }
        Some(Self { token_a, token_b })
    }

    /// True if either side of the pair is `token`.
    pub fn contains(&self, token: Address) -> bool {
        self.token_a == token || self.token_b == token
    }

    /// Reorient so that `base` is `token_a`. Returns `None` if `base` is
    /// not part of the pair.
    pub fn oriented_to(&self, base: Address) -> Option<Self> {
        if self.token_a == base {
            Some(*self)
        } else if self.token_b == base {
            Some(Self {
                token_a: self.token_b,
                token_b: self.token_a,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.token_a, self.token_b)
    }
}

/// One leg of a round trip, denominated in the settlement asset.
///
/// Produced fresh on every poll and discarded after one evaluation cycle.
/// `amount_in` is what the leg consumes and `amount_out` what it yields,
/// both in settlement-asset units — the monitor is responsible for the
/// normalization, the evaluator only checks that both quotes agree on
/// `settlement_token`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub venue: Venue,
    pub pair: TokenPair,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    /// The asset both `amount_in` and `amount_out` are denominated in.
    pub settlement_token: Address,
    pub fetched_at: DateTime<Utc>,
}

/// The materialized intent handed to the executor after a positive
/// evaluation. Created once per accepted decision, consumed exactly once.
///
/// Amounts are in settlement-asset units; the executor converts them back
/// to raw wei for the on-chain call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub pair: TokenPair,
    pub buy_venue: Venue,
    pub sell_venue: Venue,
    /// Settlement amount committed to the buy leg.
    pub amount_in: Decimal,
    /// Slippage-adjusted floor on the round-trip output.
    pub min_acceptable_output: Decimal,
    pub estimated_profit: Decimal,
    pub estimated_gas_cost: Decimal,
}

/// The shape of the on-chain call a gas estimate is requested for,
/// before the full `ExecutionRequest` exists.
#[derive(Debug, Clone, Copy)]
pub struct TradeIntent {
    pub pair: TokenPair,
    pub buy_venue: Venue,
    pub sell_venue: Venue,
    /// Raw wei input of the buy leg.
    pub amount_in: U256,
}

/// Receipt summary returned once a submitted transaction confirms.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub tx_hash: alloy::primitives::TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Outcome of one executed (or dry-run) trade, for the cycle log line.
#[derive(Debug, Clone, Serialize)]
pub struct TradeResult {
    pub pair: String,
    pub buy_venue: Venue,
    pub sell_venue: Venue,
    pub tx_hash: Option<String>,
    pub submitted: bool,
    pub estimated_profit: Decimal,
    pub execution_time_ms: u64,
}

/// Convert a raw on-chain amount into settlement units.
///
/// Returns `None` if the value does not fit `Decimal`'s 96-bit mantissa
/// (callers treat that as an unusable quote, not as zero).
pub fn wei_to_decimal(raw: U256, decimals: u8) -> Option<Decimal> {
    let raw: i128 = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals as u32).ok()
}

/// Convert a settlement-unit amount back into raw wei, truncating any
/// precision below one wei.
pub fn decimal_to_wei(value: Decimal, decimals: u8) -> Option<U256> {
    if value.is_sign_negative() {
        return None;
    }
    let scale = 10i128.checked_pow(decimals as u32)?;
    let scale = Decimal::try_from_i128_with_scale(scale, 0).ok()?;
    let raw = value.checked_mul(scale)?.trunc();
    raw.to_u128().map(U256::from)
}

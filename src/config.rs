//! Configuration management.
//!
//! Loads settings from a `.env` file / process environment into a typed
//! `BotConfig`. Everything the monitor and its collaborators need is passed
//! in explicitly from here — no ambient process-wide state.

use crate::evaluator::EvaluatorConfig;
use crate::types::Venue;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    // Network
    pub rpc_url: String,
    pub chain_id: u64,

    // Wallet
    pub private_key: String,

    // Contract addresses (BSC mainnet)
    pub pancakeswap_router: Address,
    pub bakeryswap_router: Address,
    pub factory_address: Address,
    pub arbitrage_contract: Address,

    /// Wrapped-native token all quotes and the gas cost are denominated in.
    pub settlement_token: Address,

    // Trading parameters
    /// Settlement amount fed into the buy leg of every probe.
    pub reference_amount: Decimal,
    /// Fraction, e.g. 0.01 = 1%.
    pub min_profit_margin: Decimal,
    /// Fraction, e.g. 0.005 = 0.5%.
    pub slippage_tolerance: Decimal,

    // Pair enumeration
    pub pair_limit: usize,
    pub token_cache_capacity: usize,

    // Scheduling
    pub poll_interval_ms: u64,
    pub max_concurrent_pairs: usize,

    // RPC robustness
    pub rpc_timeout_ms: u64,
    pub confirmation_timeout_secs: u64,

    // Execution
    pub max_gas_price_gwei: u64,
    pub live_mode: bool,
}

impl BotConfig {
    /// Router address for a venue.
    pub fn router_for(&self, venue: Venue) -> Address {
        match venue {
            Venue::Pancakeswap => self.pancakeswap_router,
            Venue::Bakeryswap => self.bakeryswap_router,
        }
    }

    /// The evaluator's slice of the configuration, range-validated.
    pub fn evaluator_config(&self) -> Result<EvaluatorConfig> {
        let config = EvaluatorConfig {
            min_profit_margin: self.min_profit_margin,
            slippage_tolerance: self.slippage_tolerance,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Load configuration from the default `.env` file.
pub fn load_config() -> Result<BotConfig> {
    dotenv::dotenv().ok();
    config_from_env()
}

/// Load configuration from a specific env file.
pub fn load_config_from_file(path: &str) -> Result<BotConfig> {
    dotenv::from_filename(path)
        .with_context(|| format!("Failed to load env file: {}", path))?;
    config_from_env()
}

fn config_from_env() -> Result<BotConfig> {
    let config = BotConfig {
        rpc_url: required("RPC_URL")?,
        chain_id: parsed_or("CHAIN_ID", 56)?,
        private_key: required("PRIVATE_KEY")?,

        pancakeswap_router: address("PANCAKESWAP_ROUTER")?,
        bakeryswap_router: address("BAKERYSWAP_ROUTER")?,
        factory_address: address("FACTORY_ADDRESS")?,
        arbitrage_contract: address("ARBITRAGE_CONTRACT")?,
        settlement_token: address("SETTLEMENT_TOKEN")?,

        reference_amount: parsed_or("REFERENCE_AMOUNT", Decimal::ONE)?,
        min_profit_margin: parsed_or("MIN_PROFIT_MARGIN", Decimal::from_str("0.01")?)?,
        slippage_tolerance: parsed_or("SLIPPAGE_TOLERANCE", Decimal::from_str("0.005")?)?,

        pair_limit: parsed_or("PAIR_LIMIT", 50)?,
        token_cache_capacity: parsed_or("TOKEN_CACHE_CAPACITY", 100)?,

        poll_interval_ms: parsed_or("POLL_INTERVAL_MS", 2000)?,
        max_concurrent_pairs: parsed_or("MAX_CONCURRENT_PAIRS", 8)?,

        rpc_timeout_ms: parsed_or("RPC_TIMEOUT_MS", 10_000)?,
        confirmation_timeout_secs: parsed_or("CONFIRMATION_TIMEOUT_SECS", 120)?,

        max_gas_price_gwei: parsed_or("MAX_GAS_PRICE_GWEI", 20)?,
        live_mode: parsed_or("LIVE_MODE", false)?,
    };

    // Reject out-of-range margin/slippage at startup rather than on the
    // first evaluation.
    config
        .evaluator_config()
        .context("Invalid trading parameters")?;

    if config.reference_amount <= Decimal::ZERO {
        anyhow::bail!("REFERENCE_AMOUNT must be positive");
    }
    if config.max_concurrent_pairs == 0 {
        anyhow::bail!("MAX_CONCURRENT_PAIRS must be at least 1");
    }

    Ok(config)
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} not set", key))
}

fn address(key: &str) -> Result<Address> {
    let raw = required(key)?;
    Address::from_str(raw.trim()).with_context(|| format!("{} is not a valid address", key))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} could not be parsed", key)),
        Err(_) => Ok(default),
    }
}

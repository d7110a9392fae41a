//! Two-venue DEX arbitrage bot.
//!
//! Polls swap quotes for token pairs across two BSC DEX routers, evaluates
//! buy-low/sell-high round trips against gas cost, minimum profit margin,
//! and slippage tolerance, and submits profitable trades to an on-chain
//! arbitrage contract.

pub mod config;
pub mod contracts;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod gas;
pub mod monitor;
pub mod oracle;
pub mod pairs;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, load_config_from_file, BotConfig};
pub use error::{CycleError, EvalError};
pub use evaluator::{evaluate, EvaluatorConfig};
pub use monitor::{Monitor, MonitorConfig};
pub use types::{ExecutionRequest, Quote, TokenPair, TradeResult, Venue};

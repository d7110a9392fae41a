//! Gas cost estimation for the arbitrage-contract call.
//!
//! `eth_estimateGas` against the would-be `executeArbitrage` call, with a
//! 20% buffer on the limit, times the current gas price. The result is
//! converted into settlement-asset units (the settlement token is the
//! wrapped native token, so native wei map 1:1).

use crate::config::BotConfig;
use crate::contracts::IArbitrage;
use crate::error::CycleError;
use crate::types::{wei_to_decimal, TradeIntent};
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Buffer applied to the raw gas estimate so marginal estimates still land.
const GAS_LIMIT_BUFFER_PERCENT: u64 = 20;

/// Decimals of the wrapped-native settlement token.
const NATIVE_DECIMALS: u8 = 18;

/// Gas estimation seam.
#[async_trait]
pub trait GasEstimator: Send + Sync {
    /// Estimated total gas cost of executing `intent`, in settlement units.
    async fn estimate(&self, intent: &TradeIntent) -> Result<Decimal, CycleError>;
}

/// RPC-backed estimator.
pub struct RpcGasEstimator<P> {
    provider: Arc<P>,
    config: BotConfig,
    /// Account the estimate is simulated from (the bot's wallet).
    sender: Address,
    rpc_timeout: Duration,
}

impl<P: Provider + 'static> RpcGasEstimator<P> {
    pub fn new(provider: Arc<P>, config: BotConfig, sender: Address) -> Self {
        let rpc_timeout = Duration::from_millis(config.rpc_timeout_ms);
        Self {
            provider,
            config,
            sender,
            rpc_timeout,
        }
    }
}

#[async_trait]
impl<P: Provider + 'static> GasEstimator for RpcGasEstimator<P> {
    async fn estimate(&self, intent: &TradeIntent) -> Result<Decimal, CycleError> {
        let contract = IArbitrage::new(self.config.arbitrage_contract, self.provider.clone());

        // minReturn is not known until evaluation; 0 leaves the simulated
        // call unconstrained, which is the upper bound on the swap path gas.
        let call = contract
            .executeArbitrage(
                intent.pair.token_a,
                intent.pair.token_b,
                intent.amount_in,
                U256::ZERO,
                self.config.router_for(intent.buy_venue),
                self.config.router_for(intent.sell_venue),
            )
            .from(self.sender);

        let gas_limit = tokio::time::timeout(self.rpc_timeout, call.estimate_gas())
            .await
            .map_err(|_| CycleError::Timeout(self.rpc_timeout))?
            .map_err(|e| CycleError::EstimationFailed(e.to_string()))?;

        let gas_price = tokio::time::timeout(self.rpc_timeout, self.provider.get_gas_price())
            .await
            .map_err(|_| CycleError::Timeout(self.rpc_timeout))?
            .map_err(|e| CycleError::EstimationFailed(e.to_string()))?;

        let buffered_limit = gas_limit
            .saturating_mul(100 + GAS_LIMIT_BUFFER_PERCENT)
            / 100;

        let cost_wei = (buffered_limit as u128)
            .checked_mul(gas_price)
            .ok_or_else(|| {
                CycleError::EstimationFailed("gas cost overflows u128".to_string())
            })?;

        let cost = wei_to_decimal(U256::from(cost_wei), NATIVE_DECIMALS).ok_or_else(|| {
            CycleError::EstimationFailed("gas cost does not fit Decimal".to_string())
        })?;

        debug!(
            "Gas estimate for {} {}->{}: limit={} (buffered {}), price={} wei, cost={}",
            intent.pair, intent.buy_venue, intent.sell_venue, gas_limit, buffered_limit, gas_price, cost
        );
        Ok(cost)
    }
}

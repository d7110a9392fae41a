//! Price oracle — swap quotes from venue routers.
//!
//! One RPC call per leg: `getAmountsOut(amountIn, [tokenIn, tokenOut])` on
//! the venue's router. Every call is bounded by a timeout so a stuck RPC
//! endpoint surfaces as `Timeout` instead of hanging the pair's cycle.

use crate::config::BotConfig;
use crate::contracts::IUniswapV2Router02;
use crate::error::CycleError;
use crate::types::Venue;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Quote source seam. The production implementation talks to venue routers;
/// tests substitute fakes.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Output amount the venue would currently return for swapping
    /// `amount_in` of `token_in` into `token_out`.
    async fn quote(
        &self,
        venue: Venue,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, CycleError>;
}

/// Router-backed oracle.
pub struct RouterPriceOracle<P> {
    provider: Arc<P>,
    config: BotConfig,
    rpc_timeout: Duration,
}

impl<P: Provider + 'static> RouterPriceOracle<P> {
    pub fn new(provider: Arc<P>, config: BotConfig) -> Self {
        let rpc_timeout = Duration::from_millis(config.rpc_timeout_ms);
        Self {
            provider,
            config,
            rpc_timeout,
        }
    }
}

#[async_trait]
impl<P: Provider + 'static> PriceOracle for RouterPriceOracle<P> {
    async fn quote(
        &self,
        venue: Venue,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, CycleError> {
        let router = IUniswapV2Router02::new(self.config.router_for(venue), self.provider.clone());
        let call = router.getAmountsOut(amount_in, vec![token_in, token_out]);

        let amounts = tokio::time::timeout(self.rpc_timeout, call.call())
            .await
            .map_err(|_| CycleError::Timeout(self.rpc_timeout))?
            .map_err(|e| CycleError::QuoteUnavailable {
                venue,
                reason: e.to_string(),
            })?;

        let amount_out = amounts.last().copied().ok_or(CycleError::QuoteUnavailable {
            venue,
            reason: "router returned empty amounts".to_string(),
        })?;

        debug!(
            "Quote {} {} -> {}: in={} out={}",
            venue, token_in, token_out, amount_in, amount_out
        );
        Ok(amount_out)
    }
}

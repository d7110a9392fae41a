//! Trade execution against the on-chain arbitrage contract.
//!
//! One `executeArbitrage` call per accepted `ExecutionRequest`: the contract
//! performs the buy and sell swaps atomically and reverts the whole round
//! trip if the final output falls below `minReturn`.
//!
//! Submissions from concurrently-running pair tasks are serialized behind an
//! async mutex so they cannot race the account nonce. Dry-run mode (the
//! default) logs the would-be trade without broadcasting anything.

use crate::config::BotConfig;
use crate::contracts::IArbitrage;
use crate::error::CycleError;
use crate::types::{decimal_to_wei, Confirmation, ExecutionRequest};
use alloy::primitives::TxHash;
use alloy::providers::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Decimals of the wrapped-native settlement token.
const NATIVE_DECIMALS: u8 = 18;

/// How often a pending transaction is polled for its receipt.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Execution seam. The production implementation signs and broadcasts;
/// tests substitute fakes.
#[async_trait]
pub trait ArbExecutor: Send + Sync {
    /// Build, sign, and broadcast the transaction for `request`.
    ///
    /// Returns `None` when running dry (accepted but not broadcast).
    async fn submit(&self, request: &ExecutionRequest) -> Result<Option<TxHash>, CycleError>;

    /// Wait until `tx_hash` is mined, up to `timeout`.
    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, CycleError>;
}

/// Executor backed by the deployed arbitrage contract.
pub struct ArbContractExecutor<P> {
    provider: Arc<P>,
    config: BotConfig,
    dry_run: bool,
    rpc_timeout: Duration,
    /// All pair tasks share one account nonce; submissions must not interleave.
    submit_lock: Mutex<()>,
}

impl<P: Provider + 'static> ArbContractExecutor<P> {
    /// Defaults to dry run; call `set_dry_run(false)` for live trading.
    pub fn new(provider: Arc<P>, config: BotConfig) -> Self {
        let rpc_timeout = Duration::from_millis(config.rpc_timeout_ms);
        Self {
            provider,
            config,
            dry_run: true,
            rpc_timeout,
            submit_lock: Mutex::new(()),
        }
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
        if dry_run {
            info!("Executor in DRY RUN mode - trades will be simulated");
        } else {
            warn!("Executor in LIVE mode - trades will be executed!");
        }
    }
}

#[async_trait]
impl<P: Provider + 'static> ArbExecutor for ArbContractExecutor<P> {
    async fn submit(&self, request: &ExecutionRequest) -> Result<Option<TxHash>, CycleError> {
        let amount_in = decimal_to_wei(request.amount_in, NATIVE_DECIMALS).ok_or_else(|| {
            CycleError::SubmissionFailed(format!(
                "amount_in {} not representable in wei",
                request.amount_in
            ))
        })?;
        let min_return =
            decimal_to_wei(request.min_acceptable_output, NATIVE_DECIMALS).ok_or_else(|| {
                CycleError::SubmissionFailed(format!(
                    "min_acceptable_output {} not representable in wei",
                    request.min_acceptable_output
                ))
            })?;

        if self.dry_run {
            info!(
                "DRY RUN: would execute {} | buy {} sell {} | in={} minReturn={} | est. profit {}",
                request.pair,
                request.buy_venue,
                request.sell_venue,
                amount_in,
                min_return,
                request.estimated_profit
            );
            return Ok(None);
        }

        let _guard = self.submit_lock.lock().await;

        // Refuse to broadcast into a gas spike; the margin the evaluator
        // accepted was based on a much lower cost.
        let gas_price = tokio::time::timeout(self.rpc_timeout, self.provider.get_gas_price())
            .await
            .map_err(|_| CycleError::Timeout(self.rpc_timeout))?
            .map_err(|e| CycleError::SubmissionFailed(e.to_string()))?;
        let ceiling = u128::from(self.config.max_gas_price_gwei) * 1_000_000_000u128;
        if gas_price > ceiling {
            return Err(CycleError::SubmissionFailed(format!(
                "gas price {} wei above ceiling of {} gwei",
                gas_price, self.config.max_gas_price_gwei
            )));
        }

        let contract = IArbitrage::new(self.config.arbitrage_contract, self.provider.clone());
        let call = contract.executeArbitrage(
            request.pair.token_a,
            request.pair.token_b,
            amount_in,
            min_return,
            self.config.router_for(request.buy_venue),
            self.config.router_for(request.sell_venue),
        );
        let pending = tokio::time::timeout(self.rpc_timeout, call.send())
            .await
            .map_err(|_| CycleError::Timeout(self.rpc_timeout))?
            .map_err(|e| CycleError::SubmissionFailed(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        info!(
            "Submitted arbitrage tx {} for {} (buy {} sell {})",
            tx_hash, request.pair, request.buy_venue, request.sell_venue
        );
        Ok(Some(tx_hash))
    }

    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, CycleError> {
        let poll = async {
            let mut ticker = tokio::time::interval(RECEIPT_POLL_INTERVAL);
            loop {
                ticker.tick().await;
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => continue,
                    Err(e) => return Err(CycleError::SubmissionFailed(e.to_string())),
                }
            }
        };

        let receipt = tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| CycleError::Timeout(timeout))??;

        if !receipt.status() {
            return Err(CycleError::Reverted(tx_hash));
        }

        Ok(Confirmation {
            tx_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            gas_used: receipt.gas_used,
        })
    }
}

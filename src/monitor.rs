//! Monitoring scheduler.
//!
//! One cooperative task per tracked pair, each running the same cycle on a
//! fixed delay: quote both venue orderings, evaluate, and hand any accepted
//! request to the executor. A semaphore caps how many pair cycles hit the
//! RPC endpoint at once.
//!
//! A failing cycle is caught at the cycle boundary, logged, and the pair
//! resumes on the next tick — sibling pairs are never affected. Shutdown is
//! honored at the post-delay boundary only, where no in-flight state exists.

use crate::error::CycleError;
use crate::evaluator::{evaluate, EvaluatorConfig};
use crate::executor::ArbExecutor;
use crate::gas::GasEstimator;
use crate::oracle::PriceOracle;
use crate::types::{
    decimal_to_wei, wei_to_decimal, ExecutionRequest, Quote, TokenPair, TradeIntent, TradeResult,
    VENUES,
};
use alloy::primitives::Address;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Decimals of the wrapped-native settlement token.
const NATIVE_DECIMALS: u8 = 18;

/// The monitor's slice of the bot configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub settlement_token: Address,
    /// Settlement amount fed into every buy leg probe.
    pub reference_amount: Decimal,
    pub evaluator: EvaluatorConfig,
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
    /// Upper bound on concurrently-running pair cycles.
    pub max_concurrent_pairs: usize,
}

/// Drives the per-pair monitoring cycles.
pub struct Monitor<O, G, E> {
    oracle: Arc<O>,
    gas: Arc<G>,
    executor: Arc<E>,
    config: MonitorConfig,
    cycle_gate: Arc<Semaphore>,
}

impl<O, G, E> Monitor<O, G, E>
where
    O: PriceOracle + 'static,
    G: GasEstimator + 'static,
    E: ArbExecutor + 'static,
{
    pub fn new(oracle: Arc<O>, gas: Arc<G>, executor: Arc<E>, config: MonitorConfig) -> Self {
        let cycle_gate = Arc::new(Semaphore::new(config.max_concurrent_pairs.max(1)));
        Self {
            oracle,
            gas,
            executor,
            config,
            cycle_gate,
        }
    }

    /// Spawn one monitoring task per pair and run until `shutdown` flips.
    pub async fn run(self: Arc<Self>, pairs: Vec<TokenPair>, shutdown: watch::Receiver<bool>) {
        info!("Monitoring {} pairs", pairs.len());

        let mut tasks = JoinSet::new();
        for pair in pairs {
            let monitor = Arc::clone(&self);
            let shutdown = shutdown.clone();
            tasks.spawn(async move { monitor.monitor_pair(pair, shutdown).await });
        }

        while tasks.join_next().await.is_some() {}
        info!("All pair tasks stopped");
    }

    /// Monitor a single pair until shutdown.
    async fn monitor_pair(&self, pair: TokenPair, mut shutdown: watch::Receiver<bool>) {
        info!("Monitoring pair {}", pair);

        loop {
            {
                let Ok(_permit) = self.cycle_gate.acquire().await else {
                    break;
                };

                match self.run_cycle(&pair).await {
                    Ok(Some(result)) => info!(
                        "Trade complete: {} | buy {} sell {} | est. profit {} | tx {} | {}ms",
                        result.pair,
                        result.buy_venue,
                        result.sell_venue,
                        result.estimated_profit,
                        result.tx_hash.as_deref().unwrap_or("dry-run"),
                        result.execution_time_ms
                    ),
                    Ok(None) => debug!("No arbitrage opportunity for {}", pair),
                    Err(e) => warn!("Cycle failed for {}: {} - resuming next tick", pair, e),
                }
            }

            // Cancellation point: between cycles, after the poll delay.
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }

        debug!("Pair task for {} stopped", pair);
    }

    /// One full cycle: probe both venue orderings, evaluate, execute the
    /// best accepted request if any.
    async fn run_cycle(&self, pair: &TokenPair) -> Result<Option<TradeResult>, CycleError> {
        let started = Instant::now();

        // Quotes and gas cost are only comparable when the round trip starts
        // and ends in the settlement token. Pair enumeration orients pairs
        // that way; refuse anything that slipped past it.
        if pair.token_a != self.config.settlement_token {
            return Err(CycleError::Eval(crate::error::EvalError::InvalidQuote(
                format!("pair {} is not denominated in the settlement token", pair),
            )));
        }

        let reference_raw = decimal_to_wei(self.config.reference_amount, NATIVE_DECIMALS)
            .ok_or_else(|| {
                CycleError::Eval(crate::error::EvalError::ConfigurationError(format!(
                    "reference amount {} not representable in wei",
                    self.config.reference_amount
                )))
            })?;

        let mut best: Option<ExecutionRequest> = None;

        for (buy_venue, sell_venue) in [(VENUES[0], VENUES[1]), (VENUES[1], VENUES[0])] {
            // Buy leg: settlement token -> counter token on the buy venue.
            let leg1_out = self
                .oracle
                .quote(buy_venue, pair.token_a, pair.token_b, reference_raw)
                .await?;

            // Sell leg: the buy output back to the settlement token on the
            // other venue. Closing the round trip keeps both quotes in the
            // same settlement asset.
            let leg2_out = self
                .oracle
                .quote(sell_venue, pair.token_b, pair.token_a, leg1_out)
                .await?;

            let round_trip_out = wei_to_decimal(leg2_out, NATIVE_DECIMALS).ok_or_else(|| {
                CycleError::QuoteUnavailable {
                    venue: sell_venue,
                    reason: format!("round trip output {} does not fit Decimal", leg2_out),
                }
            })?;

            let intent = TradeIntent {
                pair: *pair,
                buy_venue,
                sell_venue,
                amount_in: reference_raw,
            };
            let gas_cost = self.gas.estimate(&intent).await?;

            let fetched_at = Utc::now();
            let buy_quote = Quote {
                venue: buy_venue,
                pair: *pair,
                amount_in: self.config.reference_amount,
                // What the buy leg consumes, in settlement units.
                amount_out: self.config.reference_amount,
                settlement_token: self.config.settlement_token,
                fetched_at,
            };
            let sell_quote = Quote {
                venue: sell_venue,
                pair: *pair,
                amount_in: self.config.reference_amount,
                // What the sell leg returns, in settlement units.
                amount_out: round_trip_out,
                settlement_token: self.config.settlement_token,
                fetched_at,
            };

            match evaluate(&buy_quote, &sell_quote, gas_cost, &self.config.evaluator)? {
                Some(request) => {
                    debug!(
                        "{}: buy {} sell {} profitable, est. profit {} (gas {})",
                        pair, buy_venue, sell_venue, request.estimated_profit, gas_cost
                    );
                    let better = best
                        .as_ref()
                        .map_or(true, |b| request.estimated_profit > b.estimated_profit);
                    if better {
                        best = Some(request);
                    }
                }
                None => debug!(
                    "{}: buy {} sell {} not profitable (round trip {} for {}, gas {})",
                    pair,
                    buy_venue,
                    sell_venue,
                    round_trip_out,
                    self.config.reference_amount,
                    gas_cost
                ),
            }
        }

        let Some(request) = best else {
            return Ok(None);
        };

        info!(
            "Arbitrage opportunity found for {} between {} and {} | est. profit {} | min out {}",
            request.pair,
            request.buy_venue,
            request.sell_venue,
            request.estimated_profit,
            request.min_acceptable_output
        );

        let submitted = self.executor.submit(&request).await?;
        let tx_hash = match submitted {
            Some(hash) => {
                let confirmation = self
                    .executor
                    .await_confirmation(hash, self.config.confirmation_timeout)
                    .await?;
                info!(
                    "Arbitrage tx {} confirmed in block {} (gas used {})",
                    confirmation.tx_hash, confirmation.block_number, confirmation.gas_used
                );
                Some(format!("{:#x}", confirmation.tx_hash))
            }
            None => None,
        };

        Ok(Some(TradeResult {
            pair: request.pair.to_string(),
            buy_venue: request.buy_venue,
            sell_venue: request.sell_venue,
            submitted: tx_hash.is_some(),
            tx_hash,
            estimated_profit: request.estimated_profit,
            execution_time_ms: started.elapsed().as_millis() as u64,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::types::{Confirmation, Venue};
    use alloy::primitives::{TxHash, U256};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn settlement() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn test_pair(counter_byte: u8) -> TokenPair {
        TokenPair::new(settlement(), Address::repeat_byte(counter_byte)).unwrap()
    }

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            settlement_token: settlement(),
            reference_amount: dec!(1),
            evaluator: EvaluatorConfig {
                min_profit_margin: dec!(0.01),
                slippage_tolerance: dec!(0.005),
            },
            poll_interval: Duration::from_millis(10),
            confirmation_timeout: Duration::from_secs(5),
            max_concurrent_pairs: 4,
        }
    }

    /// Oracle with per-venue output multipliers in basis points, and an
    /// optional poisoned pair whose quotes always fail.
    struct FakeOracle {
        /// Multiplier applied per leg, in basis points (10000 = 1.0x).
        rate_bps: HashMap<Venue, u64>,
        poisoned_token: Option<Address>,
        calls: AtomicUsize,
        poisoned_calls: AtomicUsize,
    }

    impl FakeOracle {
        fn new(pancake_bps: u64, bakery_bps: u64) -> Self {
            let mut rate_bps = HashMap::new();
            rate_bps.insert(Venue::Pancakeswap, pancake_bps);
            rate_bps.insert(Venue::Bakeryswap, bakery_bps);
            Self {
                rate_bps,
                poisoned_token: None,
                calls: AtomicUsize::new(0),
                poisoned_calls: AtomicUsize::new(0),
            }
        }

        fn poison(mut self, token: Address) -> Self {
            self.poisoned_token = Some(token);
            self
        }
    }

    #[async_trait]
    impl PriceOracle for FakeOracle {
        async fn quote(
            &self,
            venue: Venue,
            token_in: Address,
            token_out: Address,
            amount_in: U256,
        ) -> Result<U256, CycleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(poisoned) = self.poisoned_token {
                if token_in == poisoned || token_out == poisoned {
                    self.poisoned_calls.fetch_add(1, Ordering::SeqCst);
                    return Err(CycleError::QuoteUnavailable {
                        venue,
                        reason: "poisoned venue".to_string(),
                    });
                }
            }

            let bps = self.rate_bps[&venue];
            Ok(amount_in * U256::from(bps) / U256::from(10_000u64))
        }
    }

    struct FakeGas {
        cost: Decimal,
    }

    #[async_trait]
    impl GasEstimator for FakeGas {
        async fn estimate(&self, _intent: &TradeIntent) -> Result<Decimal, CycleError> {
            Ok(self.cost)
        }
    }

    #[derive(Default)]
    struct FakeExecutor {
        submissions: Mutex<Vec<ExecutionRequest>>,
        live: bool,
    }

    #[async_trait]
    impl ArbExecutor for FakeExecutor {
        async fn submit(&self, request: &ExecutionRequest) -> Result<Option<TxHash>, CycleError> {
            self.submissions.lock().unwrap().push(request.clone());
            if self.live {
                Ok(Some(TxHash::repeat_byte(0x42)))
            } else {
                Ok(None)
            }
        }

        async fn await_confirmation(
            &self,
            tx_hash: TxHash,
            _timeout: Duration,
        ) -> Result<Confirmation, CycleError> {
            Ok(Confirmation {
                tx_hash,
                block_number: 123,
                gas_used: 200_000,
            })
        }
    }

    fn monitor(
        oracle: FakeOracle,
        gas_cost: Decimal,
        live: bool,
    ) -> (
        Arc<Monitor<FakeOracle, FakeGas, FakeExecutor>>,
        Arc<FakeOracle>,
        Arc<FakeExecutor>,
    ) {
        let oracle = Arc::new(oracle);
        let gas = Arc::new(FakeGas { cost: gas_cost });
        let executor = Arc::new(FakeExecutor {
            submissions: Mutex::new(Vec::new()),
            live,
        });
        let monitor = Arc::new(Monitor::new(
            Arc::clone(&oracle),
            gas,
            Arc::clone(&executor),
            test_config(),
        ));
        (monitor, oracle, executor)
    }

    #[tokio::test]
    async fn profitable_round_trip_is_executed() {
        // Pancake pays 1.2x per leg, Bakery 0.9x: buying on Pancake and
        // selling on Bakery returns 1.08x, an 8% round trip.
        let (monitor, _oracle, executor) = monitor(FakeOracle::new(12_000, 9_000), dec!(0.001), true);

        let result = monitor.run_cycle(&test_pair(0xbb)).await.unwrap();

        let result = result.expect("profitable cycle must produce a trade");
        assert_eq!(result.buy_venue, Venue::Pancakeswap);
        assert_eq!(result.sell_venue, Venue::Bakeryswap);
        assert!(result.submitted);

        let submissions = executor.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].estimated_profit, dec!(0.08));
        // 1.08 * (1 - 0.005)
        assert_eq!(submissions[0].min_acceptable_output, dec!(1.0746));
    }

    #[tokio::test]
    async fn balanced_venues_produce_no_trade() {
        // 1.0x each way: every round trip loses to gas.
        let (monitor, _oracle, executor) = monitor(FakeOracle::new(10_000, 10_000), dec!(0.001), true);

        let result = monitor.run_cycle(&test_pair(0xbb)).await.unwrap();

        assert!(result.is_none());
        assert!(executor.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn profit_below_gas_cost_is_not_executed() {
        // 1.08x round trip but gas eats 0.1 of a 0.08 profit.
        let (monitor, _oracle, executor) = monitor(FakeOracle::new(12_000, 9_000), dec!(0.1), true);

        let result = monitor.run_cycle(&test_pair(0xbb)).await.unwrap();

        assert!(result.is_none());
        assert!(executor.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dry_run_reports_unsubmitted_trade() {
        let (monitor, _oracle, executor) =
            monitor(FakeOracle::new(12_000, 9_000), dec!(0.001), false);

        let result = monitor.run_cycle(&test_pair(0xbb)).await.unwrap().unwrap();

        assert!(!result.submitted);
        assert!(result.tx_hash.is_none());
        assert_eq!(executor.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quote_failure_surfaces_as_cycle_error() {
        let pair = test_pair(0xbb);
        let (monitor, _oracle, _executor) = monitor(
            FakeOracle::new(12_000, 9_000).poison(pair.token_b),
            dec!(0.001),
            true,
        );

        let err = monitor.run_cycle(&pair).await.unwrap_err();
        assert!(matches!(err, CycleError::QuoteUnavailable { .. }));
    }

    #[tokio::test]
    async fn same_inputs_same_decision_across_cycles() {
        let (monitor, _oracle, executor) = monitor(FakeOracle::new(12_000, 9_000), dec!(0.001), true);
        let pair = test_pair(0xbb);

        monitor.run_cycle(&pair).await.unwrap();
        monitor.run_cycle(&pair).await.unwrap();

        let submissions = executor.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0], submissions[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn poisoned_pair_does_not_affect_siblings_and_keeps_ticking() {
        let healthy = test_pair(0xbb);
        let poisoned = test_pair(0xcc);

        let (monitor, oracle, executor) = monitor(
            FakeOracle::new(12_000, 9_000).poison(poisoned.token_b),
            dec!(0.001),
            true,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let run = tokio::spawn(
            Arc::clone(&monitor).run(vec![healthy, poisoned], shutdown_rx),
        );

        // Drive the paused clock through several poll delays so both pair
        // tasks get multiple ticks.
        for _ in 0..200 {
            tokio::time::advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;

            let enough_failures = oracle.poisoned_calls.load(Ordering::SeqCst) >= 3;
            let enough_trades = executor.submissions.lock().unwrap().len() >= 3;
            if enough_failures && enough_trades {
                break;
            }
        }

        shutdown_tx.send(true).unwrap();
        run.await.unwrap();

        // The poisoned pair kept getting rescheduled after each failure...
        assert!(oracle.poisoned_calls.load(Ordering::SeqCst) >= 3);
        // ...and the healthy pair kept detecting and executing trades.
        let submissions = executor.submissions.lock().unwrap();
        assert!(submissions.len() >= 3);
        assert!(submissions.iter().all(|s| s.pair == healthy));
    }

    #[tokio::test]
    async fn pair_not_based_in_settlement_token_is_rejected() {
        // token_a is some unrelated token: quoting it would produce profit
        // in that token's units while gas stays in settlement units.
        let pair =
            TokenPair::new(Address::repeat_byte(0xdd), Address::repeat_byte(0xee)).unwrap();
        let (monitor, oracle, executor) =
            monitor(FakeOracle::new(12_000, 9_000), dec!(0.001), true);

        let err = monitor.run_cycle(&pair).await.unwrap_err();

        assert!(matches!(err, CycleError::Eval(EvalError::InvalidQuote(_))));
        // No quote was fetched and nothing was submitted.
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
        assert!(executor.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unrepresentable_reference_amount_is_configuration_error() {
        let mut config = test_config();
        // Larger than Decimal can scale into 18-decimal wei.
        config.reference_amount = Decimal::MAX;

        let oracle = Arc::new(FakeOracle::new(10_000, 10_000));
        let gas = Arc::new(FakeGas { cost: dec!(0.001) });
        let executor = Arc::new(FakeExecutor::default());
        let monitor = Monitor::new(oracle, gas, executor, config);

        let err = monitor.run_cycle(&test_pair(0xbb)).await.unwrap_err();
        assert!(matches!(
            err,
            CycleError::Eval(EvalError::ConfigurationError(_))
        ));
    }
}

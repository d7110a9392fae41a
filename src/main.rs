//! Two-venue DEX arbitrage bot — main entry point.
//!
//! Startup sequence:
//! - load configuration from the env file
//! - connect one provider (RPC calls + signing) and verify the chain head
//! - enumerate tracked pairs from the factory registry
//! - wire oracle, gas estimator, and executor into the monitor
//! - run one monitoring task per pair until Ctrl-C

use alloy::network::EthereumWallet;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use clap::Parser;
use dex_sniper::config::load_config_from_file;
use dex_sniper::executor::ArbContractExecutor;
use dex_sniper::gas::RpcGasEstimator;
use dex_sniper::monitor::{Monitor, MonitorConfig};
use dex_sniper::oracle::RouterPriceOracle;
use dex_sniper::pairs::PairSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Two-venue DEX arbitrage bot (PancakeSwap / BakerySwap)
#[derive(Parser)]
#[command(name = "dex-sniper")]
struct Args {
    /// Path to the env file with network and trading settings
    #[arg(long, env = "ENV_FILE", default_value = ".env")]
    env_file: String,

    /// Force dry-run mode regardless of LIVE_MODE in the config
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("DEX arbitrage bot starting...");
    let config = load_config_from_file(&args.env_file)?;
    info!(
        "Configuration loaded from {} (chain_id: {})",
        args.env_file, config.chain_id
    );
    info!("Min profit margin: {}", config.min_profit_margin);
    info!("Slippage tolerance: {}", config.slippage_tolerance);
    info!("Poll interval: {}ms", config.poll_interval_ms);
    info!("Pair limit: {}", config.pair_limit);

    // Wallet + provider. The signer address is also the `from` account for
    // gas estimates.
    let signer: PrivateKeySigner = config
        .private_key
        .trim()
        .parse()
        .context("PRIVATE_KEY is not a valid private key")?;
    let sender = signer.address();
    info!("Wallet loaded: {}", sender);

    let wallet = EthereumWallet::from(signer);
    let provider = ProviderBuilder::new()
        .wallet(wallet)
        .connect(&config.rpc_url)
        .await
        .context("Failed to connect to RPC endpoint")?;
    let provider = Arc::new(provider);

    let block = provider.get_block_number().await?;
    info!("Connected! Current block: {}", block);

    // Enumerate tracked pairs from the factory registry.
    let mut pair_source = PairSource::new(Arc::clone(&provider), config.clone());
    let pairs = pair_source.enumerate(config.pair_limit).await?;
    if pairs.is_empty() {
        anyhow::bail!("No tracked pairs after enumeration - check FACTORY_ADDRESS and filters");
    }

    // Wire up the pipeline collaborators.
    let oracle = Arc::new(RouterPriceOracle::new(
        Arc::clone(&provider),
        config.clone(),
    ));
    let gas = Arc::new(RpcGasEstimator::new(
        Arc::clone(&provider),
        config.clone(),
        sender,
    ));

    let mut executor = ArbContractExecutor::new(Arc::clone(&provider), config.clone());
    if config.live_mode && !args.dry_run {
        executor.set_dry_run(false);
        warn!("LIVE TRADING MODE ENABLED - REAL MONEY AT RISK!");
    } else {
        info!("Trade executor initialized (DRY RUN mode)");
    }
    let executor = Arc::new(executor);

    let monitor_config = MonitorConfig {
        settlement_token: config.settlement_token,
        reference_amount: config.reference_amount,
        evaluator: config.evaluator_config()?,
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
        max_concurrent_pairs: config.max_concurrent_pairs,
    };
    let monitor = Arc::new(Monitor::new(oracle, gas, executor, monitor_config));

    // Ctrl-C flips the shutdown flag; pair tasks stop at their next
    // post-delay boundary.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested, stopping pair tasks...");
            let _ = shutdown_tx.send(true);
        }
    });

    monitor.run(pairs, shutdown_rx).await;
    info!("Bot stopped");
    Ok(())
}

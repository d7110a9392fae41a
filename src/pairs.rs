//! Pair enumeration from the factory registry.
//!
//! Walks `allPairs(0..limit)` on the factory contract and resolves each pair
//! contract's `token0`/`token1`. Enumeration is lazy per process run and
//! always restarts from index 0 — no pair state is persisted.
//!
//! Token metadata is memoized in a size-bounded FIFO cache (replacing the
//! prototype's unbounded per-contract memoization, which grew without limit
//! over a long session).

use crate::config::BotConfig;
use crate::contracts::{IUniswapV2Factory, IUniswapV2Pair};
use crate::types::TokenPair;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use anyhow::{Context, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Size-bounded cache of pair-contract token addresses, FIFO eviction.
pub struct TokenMetaCache {
    entries: HashMap<Address, (Address, Address)>,
    order: VecDeque<Address>,
    capacity: usize,
}

impl TokenMetaCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, pair_address: &Address) -> Option<(Address, Address)> {
        self.entries.get(pair_address).copied()
    }

    pub fn insert(&mut self, pair_address: Address, tokens: (Address, Address)) {
        if self.entries.insert(pair_address, tokens).is_none() {
            self.order.push_back(pair_address);
            if self.order.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.entries.remove(&evicted);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Enumerates candidate token pairs from the on-chain registry.
pub struct PairSource<P> {
    provider: Arc<P>,
    config: BotConfig,
    token_cache: TokenMetaCache,
}

impl<P: Provider + 'static> PairSource<P> {
    pub fn new(provider: Arc<P>, config: BotConfig) -> Self {
        let token_cache = TokenMetaCache::new(config.token_cache_capacity);
        Self {
            provider,
            config,
            token_cache,
        }
    }

    /// Fetch up to `limit` pairs from the factory, starting at index 0.
    ///
    /// Pairs with unreadable metadata are skipped with a warning rather than
    /// failing the whole enumeration. Pairs not containing the settlement
    /// token are dropped, and the rest are oriented so the settlement token
    /// is the base leg — every round trip starts and ends in the unit gas
    /// is priced in.
    pub async fn enumerate(&mut self, limit: usize) -> Result<Vec<TokenPair>> {
        let factory = IUniswapV2Factory::new(self.config.factory_address, self.provider.clone());

        let total = factory
            .allPairsLength()
            .call()
            .await
            .context("Failed to read allPairsLength from factory")?;
        let total = usize::try_from(total).unwrap_or(usize::MAX);
        let count = total.min(limit);
        info!("Factory has {} pairs, enumerating first {}", total, count);

        let mut pairs = Vec::with_capacity(count);

        for index in 0..count {
            let pair_address = match factory.allPairs(U256::from(index)).call().await {
                Ok(addr) => addr,
                Err(e) => {
                    warn!("Failed to read pair at registry index {}: {}", index, e);
                    continue;
                }
            };

            let (token0, token1) = match self.token_addresses(pair_address).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!("Failed to read tokens of pair {}: {}", pair_address, e);
                    continue;
                }
            };

            let Some(pair) = TokenPair::new(token0, token1) else {
                warn!("Pair {} lists the same token twice, skipping", pair_address);
                continue;
            };

            match pair.oriented_to(self.config.settlement_token) {
                Some(oriented) => pairs.push(oriented),
                None => {
                    debug!(
                        "Pair {} does not contain the settlement token, skipping",
                        pair_address
                    );
                }
            }
        }

        info!(
            "Enumeration complete: {} tracked pairs ({} token lookups cached)",
            pairs.len(),
            self.token_cache.len()
        );
        Ok(pairs)
    }

    /// token0/token1 of a pair contract, via the bounded cache.
    async fn token_addresses(&mut self, pair_address: Address) -> Result<(Address, Address)> {
        if let Some(tokens) = self.token_cache.get(&pair_address) {
            return Ok(tokens);
        }

        let pair = IUniswapV2Pair::new(pair_address, self.provider.clone());
        let token0_call = pair.token0();
        let token1_call = pair.token1();
        let (token0, token1) = tokio::try_join!(token0_call.call(), token1_call.call())
            .context("pair token0/token1 call failed")?;

        self.token_cache.insert(pair_address, (token0, token1));
        Ok((token0, token1))
    }
}

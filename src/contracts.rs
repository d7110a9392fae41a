//! Centralized contract definitions.
//!
//! All Solidity interfaces the bot talks to, defined with alloy's `sol!`
//! macro. Each interface is annotated with `#[sol(rpc)]` to generate
//! contract instance types that can make RPC calls via any alloy Provider.

use alloy::sol;

// ── Uniswap V2-style registry and pairs (PancakeSwap factory) ────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function allPairs(uint256) external view returns (address pair);
        function allPairsLength() external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

// ── Venue routers (PancakeSwap / BakerySwap, identical V2 ABI) ───────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }
}

// ── On-chain arbitrage contract (atomic buy/sell round trip) ─────────

sol! {
    #[sol(rpc)]
    interface IArbitrage {
        function executeArbitrage(address tokenA, address tokenB, uint256 amountIn, uint256 minReturn, address buyRouter, address sellRouter) external returns (uint256 amountOut);
    }
}

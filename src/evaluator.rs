//! Opportunity evaluator — the decision core.
//!
//! Given two settlement-denominated quotes for the same pair from two venues,
//! decides whether a buy-low/sell-high round trip is worth executing and, if
//! so, produces the trade parameters. Pure function: no I/O, no hidden state,
//! no logging — rejection reasons are returned to the caller, which owns the
//! log lines.
//!
//! Decision rule:
//! 1. profit = sell_quote.amount_out - buy_quote.amount_out
//! 2. reject if profit <= estimated_gas_cost
//! 3. reject if profit / buy_quote.amount_out < min_profit_margin
//! 4. otherwise min_acceptable_output = sell_quote.amount_out * (1 - slippage_tolerance)
//!
//! Both quotes must be denominated in the same settlement asset; quotes in
//! different units are rejected as invalid rather than subtracted raw.

use crate::error::EvalError;
use crate::types::{ExecutionRequest, Quote};
use rust_decimal::Decimal;

/// Range-validated evaluator parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluatorConfig {
    /// Minimum gross profit relative to the buy-side amount. Fraction,
    /// e.g. 0.01 = 1%.
    pub min_profit_margin: Decimal,
    /// Allowance for price movement between quote and execution. Fraction
    /// in [0, 1), e.g. 0.005 = 0.5%.
    pub slippage_tolerance: Decimal,
}

impl EvaluatorConfig {
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.min_profit_margin < Decimal::ZERO {
            return Err(EvalError::ConfigurationError(format!(
                "min_profit_margin must be >= 0, got {}",
                self.min_profit_margin
            )));
        }
        if self.slippage_tolerance < Decimal::ZERO || self.slippage_tolerance >= Decimal::ONE {
            return Err(EvalError::ConfigurationError(format!(
                "slippage_tolerance must be in [0, 1), got {}",
                self.slippage_tolerance
            )));
        }
        Ok(())
    }
}

/// Decide whether the round trip described by `buy_quote` and `sell_quote`
/// should be executed.
///
/// `buy_quote.amount_out` is the settlement amount the buy leg consumes and
/// `sell_quote.amount_out` the settlement amount the sell leg returns;
/// `estimated_gas_cost` is in the same unit. Returns `Ok(None)` for a normal
/// negative decision (not profitable), an `ExecutionRequest` for a positive
/// one, and an error only for invalid inputs.
pub fn evaluate(
    buy_quote: &Quote,
    sell_quote: &Quote,
    estimated_gas_cost: Decimal,
    config: &EvaluatorConfig,
) -> Result<Option<ExecutionRequest>, EvalError> {
    config.validate()?;

    if buy_quote.pair != sell_quote.pair {
        return Err(EvalError::InvalidQuote(format!(
            "quotes are for different pairs: {} vs {}",
            buy_quote.pair, sell_quote.pair
        )));
    }
    if buy_quote.venue == sell_quote.venue {
        return Err(EvalError::InvalidQuote(format!(
            "buy and sell quotes are from the same venue: {}",
            buy_quote.venue
        )));
    }
    if buy_quote.settlement_token != sell_quote.settlement_token {
        return Err(EvalError::InvalidQuote(format!(
            "quotes are denominated in different settlement assets: {} vs {}",
            buy_quote.settlement_token, sell_quote.settlement_token
        )));
    }
    check_amounts(buy_quote)?;
    check_amounts(sell_quote)?;
    if estimated_gas_cost < Decimal::ZERO {
        return Err(EvalError::InvalidQuote(format!(
            "estimated gas cost must be >= 0, got {}",
            estimated_gas_cost
        )));
    }

    let profit = sell_quote.amount_out - buy_quote.amount_out;

    if profit <= estimated_gas_cost {
        return Ok(None);
    }

    // Gross margin over the buy-side amount. buy_quote.amount_out > 0 is
    // guaranteed by check_amounts above.
    let margin = profit / buy_quote.amount_out;
    if margin < config.min_profit_margin {
        return Ok(None);
    }

    let min_acceptable_output =
        sell_quote.amount_out * (Decimal::ONE - config.slippage_tolerance);

    Ok(Some(ExecutionRequest {
        pair: buy_quote.pair,
        buy_venue: buy_quote.venue,
        sell_venue: sell_quote.venue,
        amount_in: buy_quote.amount_out,
        min_acceptable_output,
        estimated_profit: profit,
        estimated_gas_cost,
    }))
}

fn check_amounts(quote: &Quote) -> Result<(), EvalError> {
    if quote.amount_in <= Decimal::ZERO || quote.amount_out <= Decimal::ZERO {
        return Err(EvalError::InvalidQuote(format!(
            "{} quote has non-positive amount (in={}, out={})",
            quote.venue, quote.amount_in, quote.amount_out
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TokenPair, Venue};
    use alloy::primitives::Address;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn settlement() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn pair() -> TokenPair {
        TokenPair::new(settlement(), Address::repeat_byte(0xbb)).unwrap()
    }

    fn quote(venue: Venue, amount_out: Decimal) -> Quote {
        Quote {
            venue,
            pair: pair(),
            amount_in: amount_out.max(dec!(1)),
            amount_out,
            settlement_token: settlement(),
            fetched_at: Utc::now(),
        }
    }

    fn config() -> EvaluatorConfig {
        EvaluatorConfig {
            min_profit_margin: dec!(0.01),
            slippage_tolerance: dec!(0.005),
        }
    }

    #[test]
    fn rejects_when_profit_does_not_cover_gas() {
        // buy=100, sell=105, gas=10 -> profit 5 <= 10
        let buy = quote(Venue::Pancakeswap, dec!(100));
        let sell = quote(Venue::Bakeryswap, dec!(105));

        let decision = evaluate(&buy, &sell, dec!(10), &config()).unwrap();
        assert!(decision.is_none());
    }

    #[test]
    fn rejects_when_margin_below_minimum() {
        // buy=1000, sell=1008, gas=1 -> profit 8 covers gas, but 0.8% < 1%
        let buy = quote(Venue::Pancakeswap, dec!(1000));
        let sell = quote(Venue::Bakeryswap, dec!(1008));

        let decision = evaluate(&buy, &sell, dec!(1), &config()).unwrap();
        assert!(decision.is_none());
    }

    #[test]
    fn accepts_and_computes_slippage_bounded_output() {
        // buy=1000, sell=1050, gas=5 -> profit 50, margin 5%
        let buy = quote(Venue::Pancakeswap, dec!(1000));
        let sell = quote(Venue::Bakeryswap, dec!(1050));

        let request = evaluate(&buy, &sell, dec!(5), &config())
            .unwrap()
            .expect("profitable round trip must be accepted");

        assert_eq!(request.buy_venue, Venue::Pancakeswap);
        assert_eq!(request.sell_venue, Venue::Bakeryswap);
        assert_eq!(request.estimated_profit, dec!(50));
        // 1050 * (1 - 0.005) = 1044.75, exactly
        assert_eq!(request.min_acceptable_output, dec!(1044.75));
    }

    #[test]
    fn profit_exactly_equal_to_gas_is_rejected() {
        let buy = quote(Venue::Pancakeswap, dec!(100));
        let sell = quote(Venue::Bakeryswap, dec!(110));

        let decision = evaluate(&buy, &sell, dec!(10), &config()).unwrap();
        assert!(decision.is_none());
    }

    #[test]
    fn zero_slippage_keeps_full_sell_quote() {
        let buy = quote(Venue::Pancakeswap, dec!(1000));
        let sell = quote(Venue::Bakeryswap, dec!(1050));
        let config = EvaluatorConfig {
            min_profit_margin: dec!(0.01),
            slippage_tolerance: Decimal::ZERO,
        };

        let request = evaluate(&buy, &sell, dec!(5), &config).unwrap().unwrap();
        assert_eq!(request.min_acceptable_output, dec!(1050));
    }

    #[test]
    fn negative_quote_is_invalid_not_coerced() {
        let buy = quote(Venue::Pancakeswap, dec!(-100));
        let sell = quote(Venue::Bakeryswap, dec!(1050));

        let err = evaluate(&buy, &sell, dec!(5), &config()).unwrap_err();
        assert!(matches!(err, EvalError::InvalidQuote(_)));
    }

    #[test]
    fn zero_quote_is_invalid() {
        let buy = quote(Venue::Pancakeswap, dec!(1000));
        let sell = quote(Venue::Bakeryswap, Decimal::ZERO);

        let err = evaluate(&buy, &sell, dec!(5), &config()).unwrap_err();
        assert!(matches!(err, EvalError::InvalidQuote(_)));
    }

    #[test]
    fn mismatched_settlement_assets_are_invalid() {
        let buy = quote(Venue::Pancakeswap, dec!(1000));
        let mut sell = quote(Venue::Bakeryswap, dec!(1050));
        sell.settlement_token = Address::repeat_byte(0xcc);

        let err = evaluate(&buy, &sell, dec!(5), &config()).unwrap_err();
        assert!(matches!(err, EvalError::InvalidQuote(_)));
    }

    #[test]
    fn same_venue_on_both_legs_is_invalid() {
        let buy = quote(Venue::Pancakeswap, dec!(1000));
        let sell = quote(Venue::Pancakeswap, dec!(1050));

        let err = evaluate(&buy, &sell, dec!(5), &config()).unwrap_err();
        assert!(matches!(err, EvalError::InvalidQuote(_)));
    }

    #[test]
    fn negative_margin_is_configuration_error() {
        let config = EvaluatorConfig {
            min_profit_margin: dec!(-0.01),
            slippage_tolerance: dec!(0.005),
        };
        let buy = quote(Venue::Pancakeswap, dec!(1000));
        let sell = quote(Venue::Bakeryswap, dec!(1050));

        let err = evaluate(&buy, &sell, dec!(5), &config).unwrap_err();
        assert!(matches!(err, EvalError::ConfigurationError(_)));
    }

    #[test]
    fn slippage_of_one_or_more_is_configuration_error() {
        for slippage in [dec!(1), dec!(1.5)] {
            let config = EvaluatorConfig {
                min_profit_margin: dec!(0.01),
                slippage_tolerance: slippage,
            };
            let buy = quote(Venue::Pancakeswap, dec!(1000));
            let sell = quote(Venue::Bakeryswap, dec!(1050));

            let err = evaluate(&buy, &sell, dec!(5), &config).unwrap_err();
            assert!(matches!(err, EvalError::ConfigurationError(_)));
        }
    }

    #[test]
    fn identical_inputs_yield_identical_decisions() {
        let buy = quote(Venue::Pancakeswap, dec!(1000));
        let sell = quote(Venue::Bakeryswap, dec!(1050));
        let config = config();

        let first = evaluate(&buy, &sell, dec!(5), &config).unwrap();
        let second = evaluate(&buy, &sell, dec!(5), &config).unwrap();
        assert_eq!(first, second);
    }
}

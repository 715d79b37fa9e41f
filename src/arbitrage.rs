//! Arbitrage detection and stake allocation.
//!
//! For a binary market, a hedge exists when opposite sides can be bought on
//! two venues for a combined after-fee cost under $1 of payout. With
//! `p1`, `p2` the leg prices and `f1`, `f2` the venue fees on winnings,
//! arbitrage requires `p1/(1-f1) + p2/(1-f2) < 1`. Stakes are then split so
//! profit is locked in whichever way the event resolves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fees::FeeSchedule;
use crate::market::Market;

/// Tolerance for floating-point comparison of profit floors.
const PROFIT_EPSILON: f64 = 1e-6;

/// Which side of a binary market a stake is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Yes => write!(f, "yes"),
            Side::No => write!(f, "no"),
        }
    }
}

/// A hedged pair of opposite-side bets that locks in profit regardless of
/// the outcome. Immutable once constructed; `min_profit` meets the engine's
/// configured floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub market_a: Market,
    pub market_b: Market,
    /// Fuzzy match score (0-100) that justified pairing the two markets.
    /// Informational only, never used by the math.
    pub match_score: f64,
    pub side_a: Side,
    pub side_b: Side,
    pub stake_a: f64,
    pub stake_b: f64,
    pub total_investment: f64,
    pub profit_if_yes: f64,
    pub profit_if_no: f64,
    pub min_profit: f64,
    pub roi_percent: f64,
    pub timestamp: DateTime<Utc>,
}

/// One leg of a prospective hedge: a price strictly inside (0, 1) and the
/// venue's fee on winning profit.
#[derive(Debug, Clone, Copy)]
struct Leg {
    price: f64,
    fee: f64,
}

impl Leg {
    /// Returns None for degenerate prices (settled or broken markets).
    fn new(price: f64, fee: f64) -> Option<Self> {
        if price > 0.0 && price < 1.0 {
            Some(Self { price, fee })
        } else {
            None
        }
    }

    /// Net payout per dollar staked on a winning leg: the payout is
    /// 1/price, the profit portion (1/price - 1) is reduced by the fee.
    /// Canonical formula for every reported profit figure.
    fn payout_per_dollar(self) -> f64 {
        1.0 + (1.0 / self.price - 1.0) * (1.0 - self.fee)
    }

    /// `(1 - fee) / price` shortcut, used for the feasibility test and the
    /// stake-ratio derivation. Understates `payout_per_dollar` by exactly
    /// `fee` per dollar staked, so it is the conservative bound.
    fn effective_return(self) -> f64 {
        (1.0 - self.fee) / self.price
    }
}

/// Detects arbitrage between matched market pairs.
///
/// Pure computation over its arguments: safe to call concurrently, no
/// shared state. The only side effect is a tracing event when an
/// opportunity is found.
pub struct ArbitrageEngine {
    fees: FeeSchedule,
    min_profit: f64,
}

impl ArbitrageEngine {
    /// `min_profit` is the guaranteed-profit floor in dollars; stakes are
    /// sized to hit it exactly rather than to maximize capital deployed.
    pub fn new(fees: FeeSchedule, min_profit: f64) -> Self {
        Self { fees, min_profit }
    }

    /// Check a matched pair of markets for a profitable hedge.
    ///
    /// Tries both directional strategies (YES on A / NO on B, and the
    /// reverse) and returns the one with the larger guaranteed profit.
    /// Degenerate prices, unprofitable combinations, and below-floor edges
    /// all yield None, never an error.
    pub fn detect(
        &self,
        market_a: &Market,
        market_b: &Market,
        match_score: f64,
    ) -> Option<ArbitrageOpportunity> {
        let fee_a = self.fees.rate_for(&market_a.venue);
        let fee_b = self.fees.rate_for(&market_b.venue);

        // Same-side combinations can never hedge, so only the two
        // opposite-side strategies are enumerated.
        let strategies = [(Side::Yes, Side::No), (Side::No, Side::Yes)];

        let best = strategies
            .into_iter()
            .filter_map(|(side_a, side_b)| {
                self.evaluate(market_a, market_b, match_score, side_a, side_b, fee_a, fee_b)
            })
            .max_by(|a, b| {
                a.min_profit
                    .partial_cmp(&b.min_profit)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;

        info!(
            "ARBITRAGE FOUND: {} - min profit ${:.2}, ROI {:.2}%",
            market_a.event_title, best.min_profit, best.roi_percent
        );

        Some(best)
    }

    /// Evaluate a single directional strategy: `side_a` on market A hedged
    /// by `side_b` on market B.
    fn evaluate(
        &self,
        market_a: &Market,
        market_b: &Market,
        match_score: f64,
        side_a: Side,
        side_b: Side,
        fee_a: f64,
        fee_b: f64,
    ) -> Option<ArbitrageOpportunity> {
        let leg_a = Leg::new(market_a.price(side_a), fee_a)?;
        let leg_b = Leg::new(market_b.price(side_b), fee_b)?;

        let return_a = leg_a.effective_return();
        let return_b = leg_b.effective_return();

        // Hedge feasibility: combined implied probability after fees must
        // be under 100%.
        let combined = 1.0 / return_a + 1.0 / return_b;
        if combined >= 1.0 {
            return None;
        }

        // Staking `ratio` dollars on A per $1 on B equalizes the two
        // outcome profits: ratio * return_a - (ratio + 1) on an A win
        // equals return_b - (ratio + 1) on a B win.
        let ratio = return_b / return_a;
        let unit_investment = ratio + 1.0;
        let unit_profit_a = ratio * return_a - unit_investment;
        let unit_profit_b = return_b - unit_investment;
        let unit_profit = unit_profit_a.min(unit_profit_b);

        if unit_profit <= 0.0 {
            return None;
        }

        // Scale so the guaranteed profit lands on the configured floor
        // exactly, not merely above it.
        let scale = self.min_profit / unit_profit;
        let stake_a = ratio * scale;
        let stake_b = scale;
        let total_investment = unit_investment * scale;

        // Reported profits come from the exact payout formula, not the
        // effective-return shortcut.
        let profit_a_wins = stake_a * leg_a.payout_per_dollar() - total_investment;
        let profit_b_wins = stake_b * leg_b.payout_per_dollar() - total_investment;

        // The leg holding `Yes` decides which profit belongs to a YES
        // resolution.
        let (profit_if_yes, profit_if_no) = match side_a {
            Side::Yes => (profit_a_wins, profit_b_wins),
            Side::No => (profit_b_wins, profit_a_wins),
        };

        if profit_if_yes < self.min_profit - PROFIT_EPSILON
            || profit_if_no < self.min_profit - PROFIT_EPSILON
        {
            return None;
        }

        let min_profit = profit_if_yes.min(profit_if_no);
        let roi_percent = min_profit / total_investment * 100.0;

        Some(ArbitrageOpportunity {
            market_a: market_a.clone(),
            market_b: market_b.clone(),
            match_score,
            side_a,
            side_b,
            stake_a,
            stake_b,
            total_investment,
            profit_if_yes,
            profit_if_no,
            min_profit,
            roi_percent,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn engine(min_profit: f64) -> ArbitrageEngine {
        ArbitrageEngine::new(FeeSchedule::default(), min_profit)
    }

    fn fee_free_engine(min_profit: f64) -> ArbitrageEngine {
        let fees = FeeSchedule::new(HashMap::new(), 0.0)
            .with_rate("polymarket", 0.0)
            .with_rate("kalshi", 0.0);
        ArbitrageEngine::new(fees, min_profit)
    }

    fn poly(yes: f64, no: f64) -> Market {
        Market::new("polymarket", "1", "Test Event", yes, no)
            .with_url("https://polymarket.com/event/1")
    }

    fn kalshi(yes: f64, no: f64) -> Market {
        Market::new("kalshi", "TEST", "Test Event", yes, no)
            .with_url("https://kalshi.com/markets/TEST")
    }

    #[test]
    fn clear_arbitrage_opportunity() {
        // Cheap YES on Polymarket (0.40) against cheap NO on Kalshi (0.55):
        // after 2%/7% fees the combined implied probability is just under 1.
        let opportunity = engine(100.0)
            .detect(&poly(0.40, 0.60), &kalshi(0.45, 0.55), 100.0)
            .expect("this mispricing supports a hedge");

        assert_eq!(opportunity.side_a, Side::Yes);
        assert_eq!(opportunity.side_b, Side::No);
        assert!(opportunity.min_profit >= 100.0 - 1e-6);
        assert!(opportunity.stake_a > 0.0);
        assert!(opportunity.stake_b > 0.0);
        assert!(opportunity.roi_percent > 0.0);
        assert_eq!(opportunity.match_score, 100.0);
    }

    #[test]
    fn no_arbitrage_on_fair_prices() {
        // Identical fair quotes on both venues: fees alone push the
        // combined return to 1 or above for both strategies.
        let fees = FeeSchedule::default()
            .with_rate("polymarket", 0.02)
            .with_rate("kalshi", 0.02);
        let engine = ArbitrageEngine::new(fees, 1.0);

        let result = engine.detect(&poly(0.50, 0.50), &kalshi(0.50, 0.50), 100.0);
        assert!(result.is_none());
    }

    #[test]
    fn fee_free_break_even_is_not_an_opportunity() {
        // Without fees, 0.50 + 0.50 sums to exactly 1: strictly-under is
        // required, so break-even is rejected.
        let result = fee_free_engine(1.0).detect(&poly(0.50, 0.50), &kalshi(0.50, 0.50), 100.0);
        assert!(result.is_none());
    }

    #[test]
    fn marginal_edge_is_swamped_by_fees() {
        // A 1-2 cent mispricing cannot outrun 2%/7% fees no matter the
        // threshold: both strategies fail the feasibility test before any
        // scaling happens.
        let result = engine(10_000.0).detect(&poly(0.48, 0.52), &kalshi(0.49, 0.51), 100.0);
        assert!(result.is_none());

        let result = engine(1.0).detect(&poly(0.48, 0.52), &kalshi(0.49, 0.51), 100.0);
        assert!(result.is_none());
    }

    #[test]
    fn positive_edge_scales_to_any_threshold() {
        // When unit profit is positive, stakes scale to meet an arbitrarily
        // high floor; the guarantee holds at the scaled size.
        let opportunity = engine(10_000.0)
            .detect(&poly(0.30, 0.70), &kalshi(0.45, 0.55), 100.0)
            .expect("a wide mispricing scales to a large floor");

        assert!(opportunity.profit_if_yes >= 10_000.0 - 1e-6);
        assert!(opportunity.profit_if_no >= 10_000.0 - 1e-6);
    }

    #[test]
    fn degenerate_prices_skip_strategy_without_panic() {
        let result = engine(100.0).detect(&poly(0.0, 1.0), &kalshi(0.5, 0.5), 100.0);
        assert!(result.is_none());

        let result = engine(100.0).detect(&poly(0.5, 0.5), &kalshi(1.0, 0.0), 100.0);
        assert!(result.is_none());
    }

    #[test]
    fn one_degenerate_leg_leaves_other_strategy_live() {
        // YES on A is settled at 0, but NO on A (0.30) against YES on B
        // (0.45) still hedges.
        let opportunity = engine(100.0)
            .detect(&poly(0.0, 0.30), &kalshi(0.45, 0.55), 100.0)
            .expect("the untouched strategy should still be evaluated");

        assert_eq!(opportunity.side_a, Side::No);
        assert_eq!(opportunity.side_b, Side::Yes);
    }

    #[test]
    fn conservation_and_roi_consistency() {
        let opportunity = engine(100.0)
            .detect(&poly(0.30, 0.70), &kalshi(0.45, 0.55), 95.0)
            .expect("known arbitrage scenario");

        assert!(
            (opportunity.total_investment - (opportunity.stake_a + opportunity.stake_b)).abs()
                < 1e-9
        );

        let expected_roi = opportunity.min_profit / opportunity.total_investment * 100.0;
        assert!((opportunity.roi_percent - expected_roi).abs() < 1e-9);

        assert_eq!(
            opportunity.min_profit,
            opportunity.profit_if_yes.min(opportunity.profit_if_no)
        );
    }

    #[test]
    fn reported_profits_use_exact_payout_formula() {
        // The exact formula credits the fee-free dollar of stake returned
        // on a win, so each reported profit exceeds the shortcut-derived
        // floor by fee * winning stake.
        let opportunity = engine(100.0)
            .detect(&poly(0.40, 0.60), &kalshi(0.45, 0.55), 100.0)
            .expect("known arbitrage scenario");

        let fee_a = 0.02;
        let fee_b = 0.07;
        let shortcut_yes = opportunity.profit_if_yes - fee_a * opportunity.stake_a;
        let shortcut_no = opportunity.profit_if_no - fee_b * opportunity.stake_b;

        // The shortcut profits are the equalized pair scaled to the floor.
        assert!((shortcut_yes - 100.0).abs() < 1e-6);
        assert!((shortcut_no - 100.0).abs() < 1e-6);
    }

    #[test]
    fn best_strategy_wins_when_both_are_profitable() {
        let fees = FeeSchedule::default()
            .with_rate("polymarket", 0.02)
            .with_rate("kalshi", 0.05);
        let engine = ArbitrageEngine::new(fees, 100.0);

        // A quotes both sides cheap (0.25 / 0.35), so both directions
        // against B's fair 0.50 / 0.50 are profitable.
        let market_a = poly(0.25, 0.35);
        let market_b = kalshi(0.50, 0.50);

        let first = engine
            .evaluate(&market_a, &market_b, 90.0, Side::Yes, Side::No, 0.02, 0.05)
            .expect("YES/NO should be profitable");
        let second = engine
            .evaluate(&market_a, &market_b, 90.0, Side::No, Side::Yes, 0.02, 0.05)
            .expect("NO/YES should be profitable");

        let picked = engine
            .detect(&market_a, &market_b, 90.0)
            .expect("both strategies profitable");

        let expected = if first.min_profit >= second.min_profit {
            (first.side_a, first.min_profit)
        } else {
            (second.side_a, second.min_profit)
        };
        assert_eq!(picked.side_a, expected.0);
        assert!((picked.min_profit - expected.1).abs() < 1e-9);
    }

    #[test]
    fn opportunity_serializes_full_contract() {
        let opportunity = engine(100.0)
            .detect(&poly(0.30, 0.70), &kalshi(0.45, 0.55), 100.0)
            .expect("known arbitrage scenario");

        let value = serde_json::to_value(&opportunity).expect("serializable");
        for field in [
            "market_a",
            "market_b",
            "match_score",
            "side_a",
            "side_b",
            "stake_a",
            "stake_b",
            "total_investment",
            "profit_if_yes",
            "profit_if_no",
            "min_profit",
            "roi_percent",
            "timestamp",
        ] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(value["side_a"], "yes");

        let back: ArbitrageOpportunity =
            serde_json::from_value(value).expect("round-trips through serde");
        assert_eq!(back.min_profit, opportunity.min_profit);
    }
}

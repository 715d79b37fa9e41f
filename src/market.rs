use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized binary prediction market on one venue.
///
/// Prices are probabilities in [0, 1]: the cost to acquire one dollar of
/// payout on that side. Venues quote YES and NO independently, so the two
/// prices need not sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub venue: String,
    pub market_id: String,
    pub event_title: String,
    pub description: Option<String>,
    pub yes_price: f64,
    pub no_price: f64,
    pub volume: Option<f64>,
    pub liquidity: Option<f64>,
    pub end_date: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl Market {
    pub fn new(
        venue: impl Into<String>,
        market_id: impl Into<String>,
        event_title: impl Into<String>,
        yes_price: f64,
        no_price: f64,
    ) -> Self {
        Self {
            venue: venue.into(),
            market_id: market_id.into(),
            event_title: event_title.into(),
            description: None,
            yes_price,
            no_price,
            volume: None,
            liquidity: None,
            end_date: None,
            url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_liquidity(mut self, liquidity: f64) -> Self {
        self.liquidity = Some(liquidity);
        self
    }

    pub fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Price for one side of the market.
    pub fn price(&self, side: crate::arbitrage::Side) -> f64 {
        match side {
            crate::arbitrage::Side::Yes => self.yes_price,
            crate::arbitrage::Side::No => self.no_price,
        }
    }

    /// True while at least one quoted price lies strictly inside (0, 1).
    ///
    /// A price of exactly 0 or 1 marks a settled or degenerate side; a
    /// market where both sides are degenerate can never take part in a
    /// hedge.
    pub fn has_tradable_side(&self) -> bool {
        let tradable = |p: f64| p > 0.0 && p < 1.0;
        tradable(self.yes_price) || tradable(self.no_price)
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (Yes: ${:.2}, No: ${:.2})",
            self.venue, self.event_title, self.yes_price, self.no_price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_optional_fields() {
        let market = Market::new("polymarket", "mkt-1", "Will it happen?", 0.4, 0.6)
            .with_volume(1500.0)
            .with_url("https://polymarket.com/event/mkt-1");

        assert_eq!(market.venue, "polymarket");
        assert_eq!(market.volume, Some(1500.0));
        assert!(market.description.is_none());
        assert!(market.has_tradable_side());
    }

    #[test]
    fn settled_markets_have_no_tradable_side() {
        let market = Market::new("kalshi", "SETTLED", "Done deal", 1.0, 0.0);
        assert!(!market.has_tradable_side());
    }

    #[test]
    fn one_live_side_is_enough() {
        let market = Market::new("kalshi", "HALF", "One side settled", 0.0, 0.30);
        assert!(market.has_tradable_side());
    }
}

use std::collections::HashMap;
use tracing::warn;

/// Per-venue fee rates, as fractions of winning profit.
///
/// Fees apply to the profit portion of a winning payout, not the stake:
/// a $1 stake at price p pays 1/p on a win, of which (1/p - 1) is profit,
/// and the venue keeps `rate` of that profit.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    rates: HashMap<String, f64>,
    default_rate: f64,
}

impl FeeSchedule {
    /// Conservative fallback applied to venues without a configured rate.
    pub const DEFAULT_RATE: f64 = 0.05;

    pub fn new(rates: HashMap<String, f64>, default_rate: f64) -> Self {
        Self {
            rates,
            default_rate,
        }
    }

    pub fn with_rate(mut self, venue: impl Into<String>, rate: f64) -> Self {
        self.rates.insert(venue.into(), rate);
        self
    }

    /// Fee rate for a venue. Unknown venues resolve to the default rate
    /// with a warning, never an error.
    pub fn rate_for(&self, venue: &str) -> f64 {
        match self.rates.get(venue) {
            Some(rate) => *rate,
            None => {
                warn!(
                    "No fee rate configured for venue '{}', using default {:.1}%",
                    venue,
                    self.default_rate * 100.0
                );
                self.default_rate
            }
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        let mut rates = HashMap::new();
        rates.insert("polymarket".to_string(), 0.02); // 2% on profits
        rates.insert("kalshi".to_string(), 0.07); // ~7% on profits, varies by contract
        rates.insert("predictit".to_string(), 0.10); // 10% on profits
        Self {
            rates,
            default_rate: Self::DEFAULT_RATE,
        }
    }
}

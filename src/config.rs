//! Configuration loaded from environment variables with documented
//! defaults. A `.env` file is honored when present (loaded in main).

use thiserror::Error;
use tracing::warn;

use crate::fees::FeeSchedule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TELEGRAM_BOT_TOKEN is required when TELEGRAM_ENABLED=true")]
    MissingTelegramToken,
    #[error("TELEGRAM_CHAT_ID is required when TELEGRAM_ENABLED=true")]
    MissingTelegramChatId,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub polymarket_api_url: String,
    pub kalshi_api_url: String,
    pub kalshi_email: Option<String>,
    pub kalshi_password: Option<String>,
    pub predictit_api_url: String,
    pub predictit_enabled: bool,

    pub telegram_enabled: bool,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    /// Minimum guaranteed profit in USD for a reported opportunity.
    pub min_profit_usd: f64,
    pub scan_interval_minutes: u64,
    /// Markets fetched per venue per scan.
    pub market_fetch_limit: usize,
    /// Fuzzy match threshold, 0-100.
    pub match_threshold: f64,

    // Platform fees as decimals, e.g. 0.02 = 2% of winning profit.
    pub polymarket_fee: f64,
    pub kalshi_fee: f64,
    pub predictit_fee: f64,
    pub default_fee: f64,

    pub opportunity_log_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            polymarket_api_url: "https://gamma-api.polymarket.com".to_string(),
            kalshi_api_url: "https://trading-api.kalshi.com/trade-api/v2".to_string(),
            kalshi_email: None,
            kalshi_password: None,
            predictit_api_url: "https://www.predictit.org/api/marketdata/all".to_string(),
            predictit_enabled: false,
            telegram_enabled: false,
            telegram_bot_token: None,
            telegram_chat_id: None,
            min_profit_usd: 100.0,
            scan_interval_minutes: 5,
            market_fetch_limit: 200,
            match_threshold: 85.0,
            polymarket_fee: 0.02,
            kalshi_fee: 0.07,
            predictit_fee: 0.10,
            default_fee: FeeSchedule::DEFAULT_RATE,
            opportunity_log_path: "arbitrage_log.jsonl".to_string(),
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to the
    /// defaults above. Malformed numeric values warn and keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            polymarket_api_url: env_or("POLYMARKET_API_URL", defaults.polymarket_api_url),
            kalshi_api_url: env_or("KALSHI_API_URL", defaults.kalshi_api_url),
            kalshi_email: std::env::var("KALSHI_EMAIL").ok(),
            kalshi_password: std::env::var("KALSHI_PASSWORD").ok(),
            predictit_api_url: env_or("PREDICTIT_API_URL", defaults.predictit_api_url),
            predictit_enabled: env_flag("PREDICTIT_ENABLED"),
            telegram_enabled: env_flag("TELEGRAM_ENABLED"),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID").ok(),
            min_profit_usd: env_parsed("MIN_PROFIT_USD", defaults.min_profit_usd),
            scan_interval_minutes: env_parsed("SCAN_INTERVAL_MINUTES", defaults.scan_interval_minutes),
            market_fetch_limit: env_parsed("MARKET_FETCH_LIMIT", defaults.market_fetch_limit),
            match_threshold: env_parsed("MATCH_THRESHOLD", defaults.match_threshold),
            polymarket_fee: env_parsed("POLYMARKET_FEE", defaults.polymarket_fee),
            kalshi_fee: env_parsed("KALSHI_FEE", defaults.kalshi_fee),
            predictit_fee: env_parsed("PREDICTIT_FEE", defaults.predictit_fee),
            default_fee: env_parsed("DEFAULT_FEE", defaults.default_fee),
            opportunity_log_path: env_or("OPPORTUNITY_LOG_PATH", defaults.opportunity_log_path),
        }
    }

    /// Startup validation: enabling a channel without its credentials is a
    /// hard error, not a runtime surprise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_enabled {
            if self.telegram_bot_token.is_none() {
                return Err(ConfigError::MissingTelegramToken);
            }
            if self.telegram_chat_id.is_none() {
                return Err(ConfigError::MissingTelegramChatId);
            }
        }
        Ok(())
    }

    /// The fee table the engine consumes, built from the configured rates.
    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::new(Default::default(), self.default_fee)
            .with_rate("polymarket", self.polymarket_fee)
            .with_rate("kalshi", self.kalshi_fee)
            .with_rate("predictit", self.predictit_fee)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_parsed<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid {}='{}', using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

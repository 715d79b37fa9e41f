// Core modules
pub mod alerting;
pub mod arbitrage;
pub mod clients;
pub mod config;
pub mod fees;
pub mod market;
pub mod matcher;
pub mod scanner;

// Re-exports
pub use alerting::AlertManager;
pub use arbitrage::{ArbitrageEngine, ArbitrageOpportunity, Side};
pub use clients::{KalshiClient, PolymarketClient, PredictItClient};
pub use config::{Config, ConfigError};
pub use fees::FeeSchedule;
pub use market::Market;
pub use matcher::MarketMatcher;
pub use scanner::ArbitrageScanner;

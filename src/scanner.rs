//! Scan orchestration: fetch markets from every enabled venue, match
//! titles across each venue pair, run detection, dispatch alerts.

use std::time::Duration;

use anyhow::Result;
use futures::future::{join_all, BoxFuture};
use tokio::time;
use tracing::{error, info, warn};

use crate::alerting::AlertManager;
use crate::arbitrage::{ArbitrageEngine, ArbitrageOpportunity};
use crate::clients::{KalshiClient, PolymarketClient, PredictItClient};
use crate::config::Config;
use crate::market::Market;
use crate::matcher::MarketMatcher;

pub struct ArbitrageScanner {
    polymarket: PolymarketClient,
    kalshi: KalshiClient,
    predictit: Option<PredictItClient>,
    matcher: MarketMatcher,
    engine: ArbitrageEngine,
    alerts: AlertManager,
    fetch_limit: usize,
}

impl ArbitrageScanner {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let polymarket = PolymarketClient::new(&config.polymarket_api_url);

        let mut kalshi = KalshiClient::new(
            &config.kalshi_api_url,
            config.kalshi_email.clone(),
            config.kalshi_password.clone(),
        );
        kalshi.authenticate().await?;

        let predictit = config
            .predictit_enabled
            .then(|| PredictItClient::new(&config.predictit_api_url));

        let mut alerts = AlertManager::new().with_log_file(&config.opportunity_log_path);
        if config.telegram_enabled {
            // validate() guarantees both are present when enabled.
            if let (Some(token), Some(chat_id)) =
                (&config.telegram_bot_token, &config.telegram_chat_id)
            {
                alerts = alerts.with_telegram(token, chat_id);
            }
        }

        Ok(Self {
            polymarket,
            kalshi,
            predictit,
            matcher: MarketMatcher::new(config.match_threshold),
            engine: ArbitrageEngine::new(config.fee_schedule(), config.min_profit_usd),
            alerts,
            fetch_limit: config.market_fetch_limit,
        })
    }

    /// One pass: fetch, match every venue pair, detect, alert.
    pub async fn scan(&self) -> Vec<ArbitrageOpportunity> {
        info!("Starting arbitrage scan...");

        // Fully settled markets can never hedge; drop them before paying
        // for fuzzy matching. Markets with one degenerate side stay in,
        // the engine skips the dead strategy.
        let venues: Vec<(String, Vec<Market>)> = self
            .fetch_all()
            .await
            .into_iter()
            .map(|(venue, markets)| {
                let tradable = markets
                    .into_iter()
                    .filter(Market::has_tradable_side)
                    .collect::<Vec<_>>();
                (venue, tradable)
            })
            .filter(|(_, markets)| !markets.is_empty())
            .collect();

        if venues.len() < 2 {
            warn!("Markets available from fewer than two venues, nothing to compare");
            return Vec::new();
        }

        let mut opportunities = Vec::new();

        for i in 0..venues.len() {
            for j in (i + 1)..venues.len() {
                let (venue_a, markets_a) = &venues[i];
                let (venue_b, markets_b) = &venues[j];

                let matches = self.matcher.find_matches(markets_a, markets_b);
                info!(
                    "{} <-> {}: {} matching market pairs",
                    venue_a,
                    venue_b,
                    matches.len()
                );

                for (market_a, market_b, score) in matches {
                    if let Some(opportunity) = self.engine.detect(&market_a, &market_b, score) {
                        self.alerts.send_alert(&opportunity).await;
                        opportunities.push(opportunity);
                    }
                }
            }
        }

        if opportunities.is_empty() {
            info!("No arbitrage opportunities found in this scan");
        } else {
            info!("Found {} arbitrage opportunities", opportunities.len());
        }

        opportunities
    }

    /// Fetch all enabled venues concurrently. A venue that fails degrades
    /// to an empty list with an error log; the scan continues with the
    /// rest.
    async fn fetch_all(&self) -> Vec<(String, Vec<Market>)> {
        let limit = self.fetch_limit;

        let mut tasks: Vec<BoxFuture<'_, (&'static str, Result<Vec<Market>>)>> = vec![
            Box::pin(async move { ("polymarket", self.polymarket.fetch_markets(limit).await) }),
            Box::pin(async move { ("kalshi", self.kalshi.fetch_markets(limit).await) }),
        ];
        if let Some(predictit) = &self.predictit {
            tasks.push(Box::pin(async move {
                ("predictit", predictit.fetch_markets(limit).await)
            }));
        }

        join_all(tasks)
            .await
            .into_iter()
            .map(|(venue, result)| match result {
                Ok(markets) => (venue.to_string(), markets),
                Err(e) => {
                    error!("Error fetching {} markets: {:#}", venue, e);
                    (venue.to_string(), Vec::new())
                }
            })
            .collect()
    }

    /// Single scan with a summary, then exit.
    pub async fn run_once(&self) {
        info!("Running one-time arbitrage scan...");
        let opportunities = self.scan().await;

        if opportunities.is_empty() {
            info!("No arbitrage opportunities found.");
            return;
        }

        info!("SUMMARY: Found {} arbitrage opportunities", opportunities.len());
        for (i, opp) in opportunities.iter().enumerate() {
            info!(
                "{}. {} - min profit ${:.2}, ${:.2} on {} ({}), ${:.2} on {} ({})",
                i + 1,
                opp.market_a.event_title,
                opp.min_profit,
                opp.stake_a,
                opp.side_a.to_string().to_uppercase(),
                opp.market_a.venue,
                opp.stake_b,
                opp.side_b.to_string().to_uppercase(),
                opp.market_b.venue,
            );
        }
    }

    /// Scan immediately, then on every interval tick.
    pub async fn run_scheduled(&self, interval: Duration) {
        info!(
            "Starting scheduled arbitrage scanner (every {}s)",
            interval.as_secs()
        );

        let mut ticker = time::interval(interval);
        loop {
            // The first tick fires immediately.
            ticker.tick().await;
            self.scan().await;
        }
    }
}

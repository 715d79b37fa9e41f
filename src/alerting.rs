//! Alert formatting and delivery for detected opportunities.
//!
//! Channels are best-effort: a failed delivery is logged and never
//! interrupts the scan that produced the opportunity.

use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{error, info};

use crate::arbitrage::ArbitrageOpportunity;

pub struct AlertManager {
    http_client: Client,
    telegram: Option<TelegramChannel>,
    log_path: Option<PathBuf>,
}

struct TelegramChannel {
    bot_token: String,
    chat_id: String,
}

impl AlertManager {
    /// A manager with no channels configured; alerts still reach the log
    /// stream via tracing.
    pub fn new() -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http_client,
            telegram: None,
            log_path: None,
        }
    }

    pub fn with_telegram(mut self, bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        self.telegram = Some(TelegramChannel {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        });
        self
    }

    /// Append each opportunity as one JSON line to the given file.
    pub fn with_log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Send an alert through every configured channel.
    pub async fn send_alert(&self, opportunity: &ArbitrageOpportunity) {
        info!("\n{}", format_alert(opportunity));

        if self.telegram.is_some() {
            self.send_telegram_alert(opportunity).await;
        }

        if let Some(path) = &self.log_path {
            if let Err(e) = append_opportunity_log(path, opportunity) {
                error!("Failed to log opportunity: {}", e);
            }
        }
    }

    async fn send_telegram_alert(&self, opportunity: &ArbitrageOpportunity) {
        let Some(telegram) = &self.telegram else {
            return;
        };

        let message = format_telegram_alert(opportunity);
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            telegram.bot_token
        );
        let payload = serde_json::json!({
            "chat_id": telegram.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        let result = self.http_client.post(&url).json(&payload).send().await;
        match result {
            Ok(response) if response.status().is_success() => {
                info!(
                    "Telegram alert sent for {}",
                    opportunity.market_a.event_title
                );
            }
            Ok(response) => {
                error!("Telegram alert rejected: {}", response.status());
            }
            Err(e) => {
                error!("Failed to send Telegram alert: {}", e);
            }
        }
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

fn append_opportunity_log(path: &Path, opportunity: &ArbitrageOpportunity) -> anyhow::Result<()> {
    let line = serde_json::to_string(opportunity)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Human-readable alert text. Monetary figures are shown to the cent;
/// the serialized opportunity keeps full precision.
pub fn format_alert(opp: &ArbitrageOpportunity) -> String {
    format!(
        "ARBITRAGE FOUND!\n\
         Event: {}\n\
         Match Score: {:.1}%\n\
         Strategy: Bet ${:.2} on {} ({}), ${:.2} on {} ({})\n\
         Total Investment: ${:.2}\n\
         Profit if YES: ${:.2} | Profit if NO: ${:.2}\n\
         Min Profit: ${:.2} (ROI: {:.2}%)\n\
         {}: {}\n\
         {}: {}",
        opp.market_a.event_title,
        opp.match_score,
        opp.stake_a,
        opp.side_a.to_string().to_uppercase(),
        opp.market_a.venue,
        opp.stake_b,
        opp.side_b.to_string().to_uppercase(),
        opp.market_b.venue,
        opp.total_investment,
        opp.profit_if_yes,
        opp.profit_if_no,
        opp.min_profit,
        opp.roi_percent,
        opp.market_a.venue,
        opp.market_a.url.as_deref().unwrap_or("N/A"),
        opp.market_b.venue,
        opp.market_b.url.as_deref().unwrap_or("N/A"),
    )
}

fn format_telegram_alert(opp: &ArbitrageOpportunity) -> String {
    format!(
        "🚨 *ARBITRAGE ALERT* 🚨\n\n\
         *Event:* {}\n\n\
         *Strategy:*\n\
         • {}: ${:.2} on {}\n\
         • {}: ${:.2} on {}\n\n\
         *Returns:*\n\
         • Min Profit: ${:.2}\n\
         • ROI: {:.2}%\n\n\
         [{}]({}) | [{}]({})",
        opp.market_a.event_title,
        opp.market_a.venue,
        opp.stake_a,
        opp.side_a.to_string().to_uppercase(),
        opp.market_b.venue,
        opp.stake_b,
        opp.side_b.to_string().to_uppercase(),
        opp.min_profit,
        opp.roi_percent,
        opp.market_a.venue,
        opp.market_a.url.as_deref().unwrap_or(""),
        opp.market_b.venue,
        opp.market_b.url.as_deref().unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::{ArbitrageEngine, Side};
    use crate::fees::FeeSchedule;
    use crate::market::Market;

    fn sample_opportunity() -> ArbitrageOpportunity {
        let market_a = Market::new("polymarket", "1", "Will it happen?", 0.30, 0.70)
            .with_url("https://polymarket.com/event/1");
        let market_b = Market::new("kalshi", "T", "Will it happen?", 0.45, 0.55)
            .with_url("https://kalshi.com/markets/T");

        ArbitrageEngine::new(FeeSchedule::default(), 100.0)
            .detect(&market_a, &market_b, 97.5)
            .expect("known arbitrage scenario")
    }

    #[test]
    fn alert_text_carries_the_full_story() {
        let opp = sample_opportunity();
        let text = format_alert(&opp);

        assert!(text.contains("Will it happen?"));
        assert!(text.contains("Match Score: 97.5%"));
        assert!(text.contains(&format!("${:.2}", opp.stake_a)));
        assert!(text.contains(&format!("${:.2}", opp.stake_b)));
        assert!(text.contains("polymarket"));
        assert!(text.contains("kalshi"));
        assert!(text.contains("https://polymarket.com/event/1"));
        assert_eq!(opp.side_a, Side::Yes);
        assert!(text.contains("on YES"));
        assert!(text.contains("on NO"));
    }

    #[test]
    fn opportunity_log_appends_one_json_line_each() {
        let opp = sample_opportunity();
        let path = std::env::temp_dir().join("arb-scanner-alert-log-test.jsonl");
        let _ = std::fs::remove_file(&path);

        append_opportunity_log(&path, &opp).expect("first append");
        append_opportunity_log(&path, &opp).expect("second append");

        let contents = std::fs::read_to_string(&path).expect("readable");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).expect("valid JSON line");
            assert_eq!(value["match_score"], 97.5);
        }

        let _ = std::fs::remove_file(&path);
    }
}

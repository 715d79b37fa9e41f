//! Venue API clients.
//!
//! Each client fetches open binary markets from one venue and normalizes
//! them into [`Market`] records. Prices are converted to probabilities in
//! [0, 1] here so the rest of the system never sees venue price units.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::market::Market;

/// HTTP client with connection pooling and timeouts, shared setup for all
/// venues.
fn pooled_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .user_agent("prediction-arb-scanner/0.1")
        .build()
        .unwrap_or_else(|_| Client::new()) // Fallback to default if builder fails
}

/// Numeric JSON fields that some venues quote as strings.
fn value_as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn parse_rfc3339(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

// Polymarket API Client
#[derive(Clone)]
pub struct PolymarketClient {
    http_client: Client,
    api_url: String,
}

impl PolymarketClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http_client: pooled_client(),
            api_url: api_url.into(),
        }
    }

    /// Fetch active binary markets, paginating by offset until `limit`
    /// markets have been collected or the venue runs dry.
    pub async fn fetch_markets(&self, limit: usize) -> Result<Vec<Market>> {
        let mut markets = Vec::new();
        let mut offset = 0usize;

        while markets.len() < limit {
            let page_size = std::cmp::min(100, limit - markets.len());
            let url = format!("{}/markets", self.api_url);
            debug!("Fetching Polymarket markets: {} offset={}", url, offset);

            let response = self
                .http_client
                .get(&url)
                .query(&[
                    ("limit", page_size.to_string()),
                    ("offset", offset.to_string()),
                    ("active", "true".to_string()),
                ])
                .send()
                .await
                .context("Failed to fetch Polymarket markets")?;

            if !response.status().is_success() {
                return Err(anyhow::anyhow!(
                    "Polymarket API error: {}",
                    response.status()
                ));
            }

            let data: Value = response
                .json()
                .await
                .context("Failed to parse Polymarket response")?;

            // The gamma API returns either a bare array or {"data": [...]}.
            let batch = match data.as_array().or_else(|| data["data"].as_array()) {
                Some(batch) if !batch.is_empty() => batch.clone(),
                _ => break,
            };

            let batch_len = batch.len();
            for item in &batch {
                if Self::is_binary_market(item) {
                    if let Some(market) = Self::parse_market(item) {
                        markets.push(market);
                    }
                }
            }

            offset += batch_len;
            if batch_len < page_size {
                break;
            }
        }

        info!("Fetched {} binary markets from Polymarket", markets.len());
        Ok(markets)
    }

    /// Binary markets carry exactly two outcomes or tokens.
    fn is_binary_market(data: &Value) -> bool {
        let outcomes = data["outcomes"].as_array().map_or(0, |a| a.len());
        let tokens = data["tokens"].as_array().map_or(0, |a| a.len());
        outcomes == 2 || tokens == 2
    }

    /// Polymarket prices are already probabilities in [0, 1].
    fn parse_market(data: &Value) -> Option<Market> {
        let market_id = data["condition_id"]
            .as_str()
            .or_else(|| data["id"].as_str())
            .or_else(|| data["slug"].as_str())?
            .to_string();
        let title = data["question"]
            .as_str()
            .or_else(|| data["title"].as_str())?
            .to_string();

        // Prices come from outcomePrices (often stringified numbers) or
        // per-token price fields.
        let prices = data["outcomePrices"]
            .as_array()
            .or_else(|| data["outcome_prices"].as_array());
        let (yes_price, no_price) = if let Some(prices) = prices.filter(|p| p.len() >= 2) {
            (value_as_f64(&prices[0])?, value_as_f64(&prices[1])?)
        } else if let Some(tokens) = data["tokens"].as_array().filter(|t| t.len() >= 2) {
            (
                value_as_f64(&tokens[0]["price"])?,
                value_as_f64(&tokens[1]["price"])?,
            )
        } else {
            debug!("Could not extract prices for '{}', skipping", title);
            return None;
        };

        let slug = data["slug"].as_str().unwrap_or(&market_id);
        let mut market = Market::new("polymarket", &market_id, title, yes_price, no_price)
            .with_url(format!("https://polymarket.com/event/{}", slug));

        if let Some(description) = data["description"].as_str() {
            market = market.with_description(description);
        }
        if let Some(volume) = value_as_f64(&data["volume"]) {
            market = market.with_volume(volume);
        }
        if let Some(liquidity) = value_as_f64(&data["liquidity"]) {
            market = market.with_liquidity(liquidity);
        }
        if let Some(end_date) = parse_rfc3339(&data["end_date_iso"]) {
            market = market.with_end_date(end_date);
        }

        Some(market)
    }
}

// Kalshi API Client
#[derive(Clone)]
pub struct KalshiClient {
    http_client: Client,
    api_url: String,
    email: Option<String>,
    password: Option<String>,
    token: Option<String>,
}

impl KalshiClient {
    pub fn new(
        api_url: impl Into<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            http_client: pooled_client(),
            api_url: api_url.into(),
            email,
            password,
            token: None,
        }
    }

    /// Log in with email/password to obtain a bearer token. Market data
    /// endpoints work unauthenticated; a failed or skipped login is a
    /// warning, not an error.
    pub async fn authenticate(&mut self) -> Result<()> {
        let (email, password) = match (&self.email, &self.password) {
            (Some(email), Some(password)) => (email.clone(), password.clone()),
            _ => {
                warn!("Kalshi credentials not provided. Some features may not work.");
                return Ok(());
            }
        };

        let url = format!("{}/login", self.api_url);
        let response = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Failed to authenticate with Kalshi")?;

        if !response.status().is_success() {
            warn!("Kalshi login rejected: {}", response.status());
            return Ok(());
        }

        let data: Value = response
            .json()
            .await
            .context("Failed to parse Kalshi login response")?;

        match data["token"].as_str() {
            Some(token) => {
                self.token = Some(token.to_string());
                info!("Successfully authenticated with Kalshi");
            }
            None => warn!("No token received from Kalshi authentication"),
        }

        Ok(())
    }

    /// Fetch open binary markets, following the cursor until `limit`
    /// markets have been collected.
    pub async fn fetch_markets(&self, limit: usize) -> Result<Vec<Market>> {
        let mut markets = Vec::new();
        let mut cursor: Option<String> = None;

        while markets.len() < limit {
            let page_size = std::cmp::min(200, limit - markets.len());
            let url = format!("{}/markets", self.api_url);
            debug!("Fetching Kalshi markets: {} cursor={:?}", url, cursor);

            let mut request = self.http_client.get(&url).query(&[
                ("limit", page_size.to_string()),
                ("status", "open".to_string()),
            ]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("cursor", cursor)]);
            }
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to fetch Kalshi markets")?;

            if !response.status().is_success() {
                return Err(anyhow::anyhow!(
                    "Kalshi API error: {} - {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ));
            }

            let data: Value = response
                .json()
                .await
                .context("Failed to parse Kalshi response")?;

            let batch = match data["markets"].as_array() {
                Some(batch) if !batch.is_empty() => batch.clone(),
                _ => break,
            };

            for item in &batch {
                if Self::is_binary_market(item) {
                    if let Some(market) = Self::parse_market(item) {
                        markets.push(market);
                    }
                }
            }

            cursor = data["cursor"].as_str().map(|s| s.to_string());
            if cursor.is_none() {
                break;
            }
        }

        info!("Fetched {} binary markets from Kalshi", markets.len());
        Ok(markets)
    }

    fn is_binary_market(data: &Value) -> bool {
        // market_type distinguishes binary from scalar contracts; absent
        // the field, binary is the overwhelming default on Kalshi.
        data["market_type"]
            .as_str()
            .map_or(true, |t| t.eq_ignore_ascii_case("binary"))
    }

    /// Kalshi prices are quoted in cents (0-100).
    fn parse_market(data: &Value) -> Option<Market> {
        let ticker = data["ticker"].as_str()?.to_string();
        let title = data["title"].as_str().unwrap_or_default().to_string();
        let subtitle = data["subtitle"].as_str().unwrap_or_default();

        let event_title = if !subtitle.is_empty() && subtitle != title {
            format!("{}: {}", title, subtitle)
        } else {
            title
        };

        let mut yes_price = value_as_f64(&data["yes_bid"]).unwrap_or(50.0) / 100.0;
        let mut no_price = value_as_f64(&data["no_bid"]).unwrap_or(50.0) / 100.0;

        // Prefer the last traded price when present; the NO side is its
        // complement in that case.
        if let Some(last_price) = value_as_f64(&data["last_price"]) {
            yes_price = last_price / 100.0;
            no_price = 1.0 - yes_price;
        }

        let mut market = Market::new("kalshi", &ticker, event_title, yes_price, no_price)
            .with_url(format!("https://kalshi.com/markets/{}", ticker));

        if let Some(description) = data["description"].as_str() {
            market = market.with_description(description);
        }
        if let Some(volume) = value_as_f64(&data["volume"]) {
            market = market.with_volume(volume);
        }
        if let Some(open_interest) = value_as_f64(&data["open_interest"]) {
            market = market.with_liquidity(open_interest);
        }
        if let Some(end_date) = parse_rfc3339(&data["close_time"]) {
            market = market.with_end_date(end_date);
        }

        Some(market)
    }
}

// PredictIt API Client
#[derive(Clone)]
pub struct PredictItClient {
    http_client: Client,
    api_url: String,
}

impl PredictItClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http_client: pooled_client(),
            api_url: api_url.into(),
        }
    }

    /// Fetch binary markets from the public all-markets endpoint. No
    /// pagination; the endpoint returns everything in one response.
    pub async fn fetch_markets(&self, limit: usize) -> Result<Vec<Market>> {
        debug!("Fetching PredictIt markets from {}", self.api_url);

        let response = self
            .http_client
            .get(&self.api_url)
            .send()
            .await
            .context("Failed to fetch PredictIt markets")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "PredictIt API error: {}",
                response.status()
            ));
        }

        let data: Value = response
            .json()
            .await
            .context("Failed to parse PredictIt response")?;

        let all_markets = match data.as_array().or_else(|| data["markets"].as_array()) {
            Some(markets) => markets.clone(),
            None => {
                warn!("PredictIt API returned no market list");
                return Ok(Vec::new());
            }
        };

        let mut markets = Vec::new();
        for item in &all_markets {
            if markets.len() >= limit {
                break;
            }
            if Self::is_binary_market(item) {
                if let Some(market) = Self::parse_market(item) {
                    markets.push(market);
                }
            }
        }

        info!("Fetched {} binary markets from PredictIt", markets.len());
        Ok(markets)
    }

    fn is_binary_market(data: &Value) -> bool {
        data["contracts"].as_array().map_or(0, |c| c.len()) == 2
    }

    /// PredictIt prices are in cents; binary markets carry a Yes and a No
    /// contract.
    fn parse_market(data: &Value) -> Option<Market> {
        let market_id = match &data["id"] {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            _ => return None,
        };
        let name = data["name"].as_str().unwrap_or_default();
        let short_name = data["shortName"].as_str().unwrap_or_default();
        let event_title = if !short_name.is_empty() { short_name } else { name };

        let contracts = data["contracts"].as_array()?;
        if contracts.len() != 2 {
            return None;
        }

        // Named Yes/No contracts when present, positional otherwise.
        let yes_contract = contracts
            .iter()
            .find(|c| {
                c["name"]
                    .as_str()
                    .is_some_and(|n| n.eq_ignore_ascii_case("yes"))
            })
            .unwrap_or(&contracts[0]);
        let no_contract = contracts
            .iter()
            .find(|c| {
                c["name"]
                    .as_str()
                    .is_some_and(|n| n.eq_ignore_ascii_case("no"))
            })
            .unwrap_or(&contracts[1]);

        let contract_price = |contract: &Value| -> f64 {
            value_as_f64(&contract["bestBuyYesCost"])
                .or_else(|| value_as_f64(&contract["lastTradePrice"]))
                .or_else(|| value_as_f64(&contract["price"]))
                .unwrap_or(50.0)
        };

        let yes_price = contract_price(yes_contract) / 100.0;
        let no_price = contract_price(no_contract) / 100.0;

        let slug = data["urlSlug"].as_str().unwrap_or_default();
        let mut market = Market::new("predictit", &market_id, event_title, yes_price, no_price)
            .with_url(format!(
                "https://www.predictit.org/markets/detail/{}/{}",
                market_id, slug
            ));

        if let Some(description) = data["description"].as_str() {
            market = market.with_description(description);
        } else if !name.is_empty() {
            market = market.with_description(name);
        }
        if let Some(volume) =
            value_as_f64(&data["volume"]).or_else(|| value_as_f64(&data["totalVolume"]))
        {
            market = market.with_volume(volume);
        }
        if let Some(end_date) = parse_rfc3339(&data["dateEnd"]) {
            market = market.with_end_date(end_date);
        }

        Some(market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn polymarket_parses_string_prices() {
        let data = json!({
            "condition_id": "0xabc",
            "question": "Will it happen?",
            "outcomes": ["Yes", "No"],
            "outcomePrices": ["0.42", "0.58"],
            "slug": "will-it-happen",
            "volume": "12500.5",
        });

        assert!(PolymarketClient::is_binary_market(&data));
        let market = PolymarketClient::parse_market(&data).expect("parses");
        assert_eq!(market.venue, "polymarket");
        assert_eq!(market.yes_price, 0.42);
        assert_eq!(market.no_price, 0.58);
        assert_eq!(market.volume, Some(12500.5));
        assert_eq!(
            market.url.as_deref(),
            Some("https://polymarket.com/event/will-it-happen")
        );
    }

    #[test]
    fn polymarket_skips_markets_without_prices() {
        let data = json!({
            "id": "no-prices",
            "question": "Unpriced?",
            "outcomes": ["Yes", "No"],
        });
        assert!(PolymarketClient::parse_market(&data).is_none());
    }

    #[test]
    fn kalshi_converts_cents_and_prefers_last_price() {
        let data = json!({
            "ticker": "BTC-100K",
            "title": "Bitcoin above $100k",
            "subtitle": "By year end",
            "yes_bid": 40,
            "no_bid": 58,
            "last_price": 42,
            "open_interest": 9000,
        });

        let market = KalshiClient::parse_market(&data).expect("parses");
        assert_eq!(market.event_title, "Bitcoin above $100k: By year end");
        assert!((market.yes_price - 0.42).abs() < 1e-12);
        assert!((market.no_price - 0.58).abs() < 1e-12);
        assert_eq!(market.liquidity, Some(9000.0));
    }

    #[test]
    fn predictit_parses_yes_no_contracts() {
        let data = json!({
            "id": 7001,
            "name": "Will the bill pass?",
            "shortName": "Bill passes?",
            "urlSlug": "bill-passes",
            "contracts": [
                { "name": "No", "bestBuyYesCost": 55 },
                { "name": "Yes", "bestBuyYesCost": 48 },
            ],
        });

        assert!(PredictItClient::is_binary_market(&data));
        let market = PredictItClient::parse_market(&data).expect("parses");
        assert_eq!(market.venue, "predictit");
        assert_eq!(market.event_title, "Bill passes?");
        // Contracts are matched by name, not position.
        assert!((market.yes_price - 0.48).abs() < 1e-12);
        assert!((market.no_price - 0.55).abs() < 1e-12);
    }

    #[test]
    fn predictit_rejects_multi_contract_markets() {
        let data = json!({
            "id": 7002,
            "name": "Who wins the primary?",
            "contracts": [
                { "name": "Candidate A" },
                { "name": "Candidate B" },
                { "name": "Candidate C" },
            ],
        });
        assert!(!PredictItClient::is_binary_market(&data));
    }
}

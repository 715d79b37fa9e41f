//! Fuzzy matching of market titles across venues.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info};

use crate::market::Market;

/// Matches markets quoting the same event on different venues, using
/// token-sorted string similarity on normalized titles. Scores are 0-100.
pub struct MarketMatcher {
    threshold: f64,
}

impl MarketMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Normalize a market title for comparison: lowercase, strip leading
    /// question words and punctuation, collapse whitespace.
    pub fn normalize_title(&self, title: &str) -> String {
        let mut normalized = title.trim().to_lowercase();

        let prefixes = ["will ", "does ", "is ", "are ", "did "];
        for prefix in &prefixes {
            if let Some(rest) = normalized.strip_prefix(prefix) {
                normalized = rest.to_string();
                break;
            }
        }

        normalized
            .replace('?', "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Dollar amounts, percentages, and bare figures in a title. Two
    /// markets naming disjoint figures are about different events no
    /// matter how similar the words.
    pub fn extract_figures(&self, title: &str) -> HashSet<String> {
        let patterns = [
            r"\$[\d,]+(?:\.\d+)?[km]?",
            r"\d+(?:\.\d+)?%",
            r"\b\d{1,3}(?:,\d{3})*(?:\.\d+)?\b",
        ];

        let mut figures = HashSet::new();
        for pattern in &patterns {
            if let Ok(re) = Regex::new(pattern) {
                for m in re.find_iter(&title.to_lowercase()) {
                    figures.insert(m.as_str().to_string());
                }
            }
        }
        figures
    }

    /// Token-sort similarity between two titles, 0-100. Word order is
    /// ignored; disjoint numeric figures zero the score.
    pub fn similarity(&self, title_a: &str, title_b: &str) -> f64 {
        let figures_a = self.extract_figures(title_a);
        let figures_b = self.extract_figures(title_b);
        if !figures_a.is_empty() && !figures_b.is_empty() && figures_a.is_disjoint(&figures_b) {
            return 0.0;
        }

        let sorted_a = self.token_sort(&self.normalize_title(title_a));
        let sorted_b = self.token_sort(&self.normalize_title(title_b));

        strsim::normalized_levenshtein(&sorted_a, &sorted_b) * 100.0
    }

    fn token_sort(&self, normalized: &str) -> String {
        let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }

    /// Pair each market on venue A with its single best-scoring
    /// counterpart on venue B, keeping pairs at or above the threshold.
    /// Results are sorted best match first.
    pub fn find_matches(
        &self,
        a_markets: &[Market],
        b_markets: &[Market],
    ) -> Vec<(Market, Market, f64)> {
        let mut matches = Vec::new();

        for market_a in a_markets {
            let mut best: Option<(&Market, f64)> = None;

            for market_b in b_markets {
                let score = self.similarity(&market_a.event_title, &market_b.event_title);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((market_b, score));
                }
            }

            if let Some((market_b, score)) = best {
                if score >= self.threshold {
                    info!(
                        "Match found (score={:.1}): '{}' <-> '{}'",
                        score, market_a.event_title, market_b.event_title
                    );
                    matches.push((market_a.clone(), market_b.clone(), score));
                } else {
                    debug!(
                        "Best candidate for '{}' scored {:.1}, below threshold {:.1}",
                        market_a.event_title, score, self.threshold
                    );
                }
            }
        }

        matches.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        info!(
            "Found {} market matches above threshold {}",
            matches.len(),
            self.threshold
        );
        matches
    }
}

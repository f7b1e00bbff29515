//! Quote model, market-data provider contracts and the refresh cache.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum HistoryRange {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    FiveYears,
}

impl HistoryRange {
    /// Range token understood by chart-style endpoints.
    pub fn as_range_token(&self) -> &'static str {
        match self {
            HistoryRange::OneMonth => "1mo",
            HistoryRange::ThreeMonths => "3mo",
            HistoryRange::SixMonths => "6mo",
            HistoryRange::OneYear => "1y",
            HistoryRange::FiveYears => "5y",
        }
    }
}

impl Display for HistoryRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HistoryRange::OneMonth => "1M",
                HistoryRange::ThreeMonths => "3M",
                HistoryRange::SixMonths => "6M",
                HistoryRange::OneYear => "1Y",
                HistoryRange::FiveYears => "5Y",
            }
        )
    }
}

impl FromStr for HistoryRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1M" => Ok(HistoryRange::OneMonth),
            "3M" => Ok(HistoryRange::ThreeMonths),
            "6M" => Ok(HistoryRange::SixMonths),
            "1Y" => Ok(HistoryRange::OneYear),
            "5Y" => Ok(HistoryRange::FiveYears),
            _ => Err(anyhow::anyhow!("Invalid history range: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub t: DateTime<Utc>,
    pub v: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcBar {
    pub t: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fundamentals {
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
}

/// A snapshot of one instrument's market data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    /// Last traded price in the instrument's currency.
    pub last: f64,
    /// Absolute change since the previous close, same currency.
    pub change: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub series: Vec<PricePoint>,
    pub bars: Option<Vec<OhlcBar>>,
    pub fundamentals: Option<Fundamentals>,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> Result<Quote>;
    async fn get_history(&self, symbol: &str, range: HistoryRange) -> Result<Vec<OhlcBar>>;
}

pub type QuoteSnapshot = HashMap<String, Quote>;

/// Symbol-keyed quote cache with last-known-good semantics.
///
/// Refreshes run sequentially with a fixed pause between requests to respect
/// upstream rate limits. A failed fetch keeps the previously cached quote;
/// callers cannot distinguish "no fresh quote" from "fetch error", and are
/// not meant to.
pub struct QuoteCache {
    provider: Arc<dyn QuoteProvider>,
    quotes: Mutex<QuoteSnapshot>,
    request_delay: Duration,
}

impl QuoteCache {
    pub fn new(provider: Arc<dyn QuoteProvider>, request_delay: Duration) -> Self {
        Self {
            provider,
            quotes: Mutex::new(HashMap::new()),
            request_delay,
        }
    }

    /// Fetches each symbol in turn, pausing between requests. Errors are
    /// logged and swallowed; the previous quote, if any, stays in place.
    /// Returns the snapshot after the refresh. `on_progress` is invoked once
    /// per symbol.
    pub async fn refresh(&self, symbols: &[String], on_progress: &(dyn Fn() + Sync)) -> QuoteSnapshot {
        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            match self.provider.get_quote(symbol).await {
                Ok(quote) => {
                    debug!("Refreshed quote for {symbol}: {} {}", quote.last, quote.currency);
                    self.quotes.lock().await.insert(symbol.clone(), quote);
                }
                Err(e) => {
                    warn!("Quote fetch failed for {symbol}, keeping last known value: {e}");
                }
            }
            on_progress();
        }
        self.snapshot().await
    }

    pub async fn snapshot(&self) -> QuoteSnapshot {
        self.quotes.lock().await.clone()
    }

    /// Seeds the cache, e.g. from an externally persisted quote store.
    pub async fn prime(&self, quotes: QuoteSnapshot) {
        self.quotes.lock().await.extend(quotes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quote(symbol: &str, last: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            last,
            change: 0.0,
            currency: "USD".to_string(),
            timestamp: Utc::now(),
            series: Vec::new(),
            bars: None,
            fundamentals: None,
        }
    }

    /// Succeeds on the first call per symbol, fails afterwards.
    struct FlakyProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteProvider for FlakyProvider {
        async fn get_quote(&self, symbol: &str) -> Result<Quote> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                Ok(quote(symbol, 100.0))
            } else {
                Err(anyhow!("upstream unavailable"))
            }
        }

        async fn get_history(&self, _symbol: &str, _range: HistoryRange) -> Result<Vec<OhlcBar>> {
            Err(anyhow!("not implemented"))
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_good() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
        });
        let cache = QuoteCache::new(provider, Duration::ZERO);
        let symbols = vec!["AAPL".to_string()];

        let first = cache.refresh(&symbols, &|| ()).await;
        assert_eq!(first["AAPL"].last, 100.0);

        // Second refresh fails upstream; the cached quote survives.
        let second = cache.refresh(&symbols, &|| ()).await;
        assert_eq!(second["AAPL"].last, 100.0);
    }

    #[tokio::test]
    async fn test_never_fetched_symbol_is_absent() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(1), // every call fails
        });
        let cache = QuoteCache::new(provider, Duration::ZERO);

        let snapshot = cache.refresh(&["MSFT".to_string()], &|| ()).await;
        assert!(snapshot.get("MSFT").is_none());
    }

    #[tokio::test]
    async fn test_refresh_reports_progress_per_symbol() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
        });
        let cache = QuoteCache::new(provider, Duration::ZERO);
        let ticks = AtomicUsize::new(0);

        cache
            .refresh(&["A".to_string(), "B".to_string(), "C".to_string()], &|| {
                ticks.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_prime_seeds_cache() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(1), // every fetch fails
        });
        let cache = QuoteCache::new(provider, Duration::ZERO);
        cache
            .prime(HashMap::from([("AAPL".to_string(), quote("AAPL", 42.0))]))
            .await;

        // The seeded quote survives a failing refresh.
        let snapshot = cache.refresh(&["AAPL".to_string()], &|| ()).await;
        assert_eq!(snapshot["AAPL"].last, 42.0);
    }

    #[test]
    fn test_history_range_round_trip() {
        for range in [
            HistoryRange::OneMonth,
            HistoryRange::ThreeMonths,
            HistoryRange::SixMonths,
            HistoryRange::OneYear,
            HistoryRange::FiveYears,
        ] {
            let parsed: HistoryRange = range.to_string().parse().unwrap();
            assert_eq!(parsed, range);
        }
        assert!("2W".parse::<HistoryRange>().is_err());
    }
}

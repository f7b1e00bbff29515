use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::{HistoryRange, OhlcBar, PricePoint, Quote, QuoteProvider, RateProvider};

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Vec<ChartItem>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
    currency: Option<String>,
    #[serde(alias = "chartPreviousClose")]
    previous_close: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<QuoteArrays>,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteArrays {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
}

fn parse_timestamp(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

fn extract_series(item: &ChartItem) -> Vec<PricePoint> {
    let (Some(timestamps), Some(closes)) = (
        item.timestamp.as_ref(),
        item.indicators
            .as_ref()
            .and_then(|inds| inds.quote.first())
            .and_then(|q| q.close.as_ref()),
    ) else {
        return Vec::new();
    };

    timestamps
        .iter()
        .zip(closes.iter())
        .filter_map(|(ts, close)| {
            let t = parse_timestamp(*ts)?;
            close.map(|v| PricePoint { t, v })
        })
        .collect()
}

fn extract_bars(item: &ChartItem) -> Vec<OhlcBar> {
    let (Some(timestamps), Some(quote)) = (
        item.timestamp.as_ref(),
        item.indicators.as_ref().and_then(|inds| inds.quote.first()),
    ) else {
        return Vec::new();
    };

    let field = |arrays: &Option<Vec<Option<f64>>>, i: usize| -> Option<f64> {
        arrays.as_ref().and_then(|v| v.get(i).copied().flatten())
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let t = parse_timestamp(*ts)?;
            Some(OhlcBar {
                t,
                open: field(&quote.open, i)?,
                high: field(&quote.high, i)?,
                low: field(&quote.low, i)?,
                close: field(&quote.close, i)?,
            })
        })
        .collect()
}

// Yahoo v8 chart adapter for quotes and price history.
pub struct YahooQuoteProvider {
    base_url: String,
}

impl YahooQuoteProvider {
    pub fn new(base_url: &str) -> Self {
        YahooQuoteProvider {
            base_url: base_url.to_string(),
        }
    }

    async fn fetch_chart(&self, symbol: &str, range: &str) -> Result<ChartItem> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range={}",
            self.base_url, symbol, range
        );
        debug!("Requesting chart data from {}", url);

        let client = reqwest::Client::builder().user_agent("folio/1.0").build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let data = response.json::<ChartResponse>().await?;
        data.chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No chart data found for symbol: {}", symbol))
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    #[instrument(name = "YahooQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let item = self.fetch_chart(symbol, "3mo").await?;

        let last = item.meta.regular_market_price;
        let change = item
            .meta
            .previous_close
            .map(|prev| last - prev)
            .unwrap_or(0.0);
        let currency = item
            .meta
            .currency
            .clone()
            .unwrap_or_else(|| crate::core::symbology::currency_for_symbol(symbol).to_string());
        let timestamp = item
            .timestamp
            .as_ref()
            .and_then(|ts| ts.last().copied())
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        let series = extract_series(&item);
        let bars = extract_bars(&item);

        Ok(Quote {
            symbol: symbol.to_string(),
            last,
            change,
            currency,
            timestamp,
            series,
            bars: if bars.is_empty() { None } else { Some(bars) },
            fundamentals: None,
        })
    }

    async fn get_history(&self, symbol: &str, range: HistoryRange) -> Result<Vec<OhlcBar>> {
        let item = self.fetch_chart(symbol, range.as_range_token()).await?;
        Ok(extract_bars(&item))
    }
}

// Yahoo FX adapter: pairs are chart symbols of the form `USDSGD=X`.
pub struct YahooRateProvider {
    base_url: String,
}

impl YahooRateProvider {
    pub fn new(base_url: &str) -> Self {
        YahooRateProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    chart: RateChartResult,
}

#[derive(Debug, Deserialize)]
struct RateChartResult {
    result: Vec<RateChartItem>,
}

#[derive(Debug, Deserialize)]
struct RateChartItem {
    meta: RateChartMeta,
}

#[derive(Debug, Deserialize)]
struct RateChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl RateProvider for YahooRateProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let symbol = format!("{from}{to}=X");
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!("Requesting currency rate from {}", url);

        let client = reqwest::Client::builder().user_agent("folio/1.0").build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: RateResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", symbol))?;

        Ok(item.meta.regular_market_price)
    }
}

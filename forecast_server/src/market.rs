//! Daily closing prices from the Yahoo Finance chart API

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use forecast_core::Series;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Longest ticker symbol accepted
pub const MAX_TICKER_LEN: usize = 10;

/// History ranges the chart API understands
pub const PERIODS: [&str; 11] = [
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// A validated history range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period(&'static str);

impl Period {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Default for Period {
    fn default() -> Self {
        Period("1y")
    }
}

impl FromStr for Period {
    type Err = ApiError;

    fn from_str(s: &str) -> ApiResult<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        PERIODS
            .iter()
            .copied()
            .find(|p| *p == wanted)
            .map(Period)
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid period '{}'; expected one of {}",
                    s,
                    PERIODS.join(", ")
                ))
            })
    }
}

/// Upper-case and check a ticker symbol
pub fn validate_ticker(raw: &str) -> ApiResult<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(ApiError::BadRequest("Ticker symbol is required".to_string()));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(ApiError::BadRequest(format!(
            "Ticker symbol must be at most {} characters",
            MAX_TICKER_LEN
        )));
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
    {
        return Err(ApiError::BadRequest(format!(
            "Ticker symbol '{}' contains invalid characters",
            ticker
        )));
    }
    Ok(ticker)
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Turn a chart response into a daily closing-price series labelled `ticker`.
///
/// Bars without a close are skipped and bar times are truncated to the
/// trading date; a later bar on the same date replaces an earlier one.
pub fn parse_chart(json: &str, ticker: &str) -> ApiResult<Series> {
    let response: ChartResponse = serde_json::from_str(json)
        .map_err(|e| ApiError::Market(format!("Unreadable chart response: {}", e)))?;
    if let Some(error) = response.chart.error {
        return Err(ApiError::Market(format!("[{}] {}", error.code, error.description)));
    }
    let data = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ApiError::Market(format!("No data returned for {}", ticker)))?;
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut rows: Vec<(NaiveDateTime, f64)> = Vec::with_capacity(closes.len());
    for (ts, close) in data.timestamp.iter().zip(closes) {
        let (Some(close), Some(moment)) = (close, DateTime::from_timestamp(*ts, 0)) else {
            continue;
        };
        let day = NaiveDateTime::new(moment.date_naive(), NaiveTime::MIN);
        match rows.last_mut() {
            Some(last) if last.0 == day => last.1 = close,
            Some(last) if last.0 > day => continue,
            _ => rows.push((day, close)),
        }
    }
    if rows.is_empty() {
        return Err(ApiError::Market(format!("No closing prices returned for {}", ticker)));
    }

    let (timestamps, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
    Ok(Series::new(ticker, timestamps, values)?)
}

/// Async client for the chart endpoint
#[derive(Debug, Clone)]
pub struct MarketClient {
    base_url: String,
    http: reqwest::Client,
}

impl MarketClient {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| ApiError::Market(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn chart_url(&self, ticker: &str, period: Period) -> String {
        format!(
            "{}/{}?range={}&interval=1d",
            self.base_url,
            ticker,
            period.as_str()
        )
    }

    /// Fetch daily closes for `ticker` over `period`
    pub async fn daily_closes(&self, ticker: &str, period: Period) -> ApiResult<Series> {
        let url = self.chart_url(ticker, period);
        tracing::info!(ticker, period = period.as_str(), "fetching market data");
        let text = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Market(e.to_string()))?
            .text()
            .await
            .map_err(|e| ApiError::Market(e.to_string()))?;
        parse_chart(&text, ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("aapl", "AAPL")]
    #[case(" brk.b ", "BRK.B")]
    #[case("^GSPC", "^GSPC")]
    fn test_valid_tickers(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(validate_ticker(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("ABCDEFGHIJK")]
    #[case("AA PL")]
    fn test_invalid_tickers(#[case] raw: &str) {
        assert!(matches!(validate_ticker(raw), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_period_list() {
        assert_eq!("YTD".parse::<Period>().unwrap().as_str(), "ytd");
        assert!("3y".parse::<Period>().is_err());
        assert_eq!(Period::default().as_str(), "1y");
    }

    #[test]
    fn test_chart_url() {
        let client = MarketClient::new("http://localhost:9/chart/").unwrap();
        assert_eq!(
            client.chart_url("MSFT", Period::default()),
            "http://localhost:9/chart/MSFT?range=1y&interval=1d"
        );
    }

    #[test]
    fn test_parse_chart_skips_missing_closes() {
        // 2024-01-02, 2024-01-03, 2024-01-04 at 14:30 UTC
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],"indicators":{"quote":[{"close":[185.5,null,187.5]}]}}],"error":null}}"#;
        let series = parse_chart(json, "AAPL").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.date_strings(), vec!["2024-01-02", "2024-01-04"]);
        assert_eq!(series.label(), "AAPL");
    }

    #[test]
    fn test_parse_chart_api_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse_chart(json, "ZZZZ"), Err(ApiError::Market(_))));
        assert!(matches!(parse_chart("not json", "ZZZZ"), Err(ApiError::Market(_))));
    }
}

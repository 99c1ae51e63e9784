//! Yahoo Finance chart API Provider.
//!
//! `GET {base_url}/v8/finance/chart/{symbol}?range=..&interval=..`
//!
//! 시세 필드는 항상 `range=1d&interval=1d` 응답에서 가져옵니다. 다른 구간의
//! `chartPreviousClose`는 구간 시작 직전 종가이므로 전일 종가로 쓸 수 없습니다.
//! 기간 데이터가 다른 구간으로 요청되면 두 번째 요청을 동시에 보냅니다.
//!
//! 차트 `meta`에는 당일 시가가 없으므로 당일 봉의 시가를
//! `regularMarketOpen`으로 채워 [`RawTicker::info`]를 만듭니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_core::ProviderConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{HistoryRequest, MarketDataProvider, RawPeriod, RawTicker};
use crate::error::{DataError, Result};

/// 시세 필드 조회 구간.
const SESSION_RANGE: &str = "1d";
const SESSION_INTERVAL: &str = "1d";

/// 당일 봉에서 보강하는 시가 키.
const SESSION_OPEN_KEY: &str = "regularMarketOpen";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Map<String, Value>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance Provider.
#[derive(Debug, Clone)]
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    /// 설정으로 HTTP 클라이언트를 생성합니다.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }

    /// 차트 API를 호출하여 첫 번째 결과를 반환합니다.
    async fn fetch_chart(&self, symbol: &str, range: &str, interval: &str) -> Result<ChartResult> {
        let response = self
            .client
            .get(self.chart_url(symbol))
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await?;

        let status = response.status();
        debug!(%status, range, interval, "Yahoo chart 응답 수신");

        if status == StatusCode::NOT_FOUND {
            return Err(DataError::NotFound(format!("No data found for {}", symbol)));
        }
        if !status.is_success() {
            return Err(DataError::FetchError(format!(
                "Yahoo Finance returned HTTP {} for {}",
                status, symbol
            )));
        }

        let body: ChartResponse = response.json().await?;
        first_result(symbol, body)
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(skip(self), fields(provider = "yahoo"))]
    async fn fetch_ticker(
        &self,
        symbol: &str,
        history: Option<HistoryRequest>,
    ) -> Result<RawTicker> {
        let session = self.fetch_chart(symbol, SESSION_RANGE, SESSION_INTERVAL);

        let (session, series) = match &history {
            Some(req) if req.range != SESSION_RANGE || req.interval != SESSION_INTERVAL => {
                let (session, series) = tokio::try_join!(
                    session,
                    self.fetch_chart(symbol, &req.range, &req.interval)
                )?;
                (session, Some(series))
            }
            _ => (session.await?, None),
        };

        let session_bars = parse_bars(symbol, &session);
        let ticker = RawTicker::new(symbol, session_info(session.meta, &session_bars));

        Ok(match (history, series) {
            (None, _) => ticker,
            (Some(_), Some(series)) => ticker.with_history(parse_bars(symbol, &series)),
            (Some(_), None) => ticker.with_history(session_bars),
        })
    }
}

fn first_result(symbol: &str, body: ChartResponse) -> Result<ChartResult> {
    if let Some(err) = body.chart.error {
        let detail = err
            .description
            .or(err.code)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(DataError::NotFound(format!("{}: {}", symbol, detail)));
    }

    body.chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| DataError::NotFound(format!("No data found for {}", symbol)))
}

/// 타임스탬프와 OHLCV 배열을 기간 데이터로 변환합니다. OHLC 중 하나라도 없는 봉은 제외합니다.
fn parse_bars(symbol: &str, result: &ChartResult) -> Vec<RawPeriod> {
    let Some(series) = result
        .indicators
        .as_ref()
        .and_then(|ind| ind.quote.first())
    else {
        return Vec::new();
    };
    let timestamps = result.timestamp.as_deref().unwrap_or(&[]);

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;

    for (i, ts) in timestamps.iter().enumerate() {
        let bar = (
            DateTime::<Utc>::from_timestamp(*ts, 0),
            series.open.get(i).copied().flatten(),
            series.high.get(i).copied().flatten(),
            series.low.get(i).copied().flatten(),
            series.close.get(i).copied().flatten(),
        );

        let (Some(start), Some(open), Some(high), Some(low), Some(close)) = bar else {
            skipped += 1;
            continue;
        };

        let volume = series
            .volume
            .get(i)
            .copied()
            .flatten()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64);

        bars.push(RawPeriod {
            start,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if skipped > 0 {
        warn!(symbol, skipped, "OHLC 값이 없는 봉 제외");
    }

    bars
}

/// 메타데이터에 시가가 없으면 가장 최근 당일 봉의 시가로 채웁니다.
fn session_info(mut meta: Map<String, Value>, bars: &[RawPeriod]) -> Map<String, Value> {
    let has_open = meta.get(SESSION_OPEN_KEY).is_some_and(|v| !v.is_null());
    if !has_open {
        if let Some(latest) = bars.iter().max_by_key(|bar| bar.start) {
            meta.insert(SESSION_OPEN_KEY.to_string(), Value::from(latest.open));
        }
    }
    meta
}

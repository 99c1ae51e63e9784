//! Read-through 시세 서비스.
//!
//! 모든 엔드포인트가 공유하는 흐름:
//! 캐시 조회 → (miss) provider 조회 → 정규화 → 캐시 저장 → 응답.

use market_core::{AssetType, Payload};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::cache::CacheManager;
use crate::normalizer::Normalizer;
use crate::provider::{HistoryRequest, MarketDataProvider};

/// 조회 파라미터.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteParams {
    pub range: String,
    pub interval: String,
    pub include_history: bool,
}

impl QuoteParams {
    pub fn new(range: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            interval: interval.into(),
            include_history: false,
        }
    }

    pub fn with_history(mut self, include_history: bool) -> Self {
        self.include_history = include_history;
        self
    }

    fn history_request(&self) -> Option<HistoryRequest> {
        self.include_history
            .then(|| HistoryRequest::new(&self.range, &self.interval))
    }
}

impl Default for QuoteParams {
    fn default() -> Self {
        Self::new("1d", "1d")
    }
}

/// 단건 조회 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    /// 캐시 hit
    Cached(Payload),
    /// provider에서 새로 가져와 캐시에 저장함
    Fetched(Payload),
    /// 정규화 또는 provider 실패 (캐시하지 않음)
    Failed(Payload),
}

impl QuoteOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, QuoteOutcome::Failed(_))
    }

    pub fn payload(&self) -> &Payload {
        match self {
            QuoteOutcome::Cached(p) | QuoteOutcome::Fetched(p) | QuoteOutcome::Failed(p) => p,
        }
    }

    pub fn into_payload(self) -> Payload {
        match self {
            QuoteOutcome::Cached(p) | QuoteOutcome::Fetched(p) | QuoteOutcome::Failed(p) => p,
        }
    }
}

/// 배치 조회 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// 요청 순서대로의 페이로드
    pub data: Vec<Payload>,
    pub total: usize,
    /// 캐시에서 응답한 건수
    pub cached: usize,
    /// provider 조회를 시도한 건수 (실패 포함)
    pub fetched: usize,
}

/// 캐시 + provider 조합 서비스.
#[derive(Clone)]
pub struct QuoteService {
    cache: Arc<CacheManager>,
    provider: Arc<dyn MarketDataProvider>,
}

impl QuoteService {
    pub fn new(cache: Arc<CacheManager>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { cache, provider }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn provider(&self) -> &Arc<dyn MarketDataProvider> {
        &self.provider
    }

    /// 단건 조회.
    ///
    /// 실패 응답은 캐시하지 않습니다.
    #[instrument(skip(self, params), fields(range = %params.range, interval = %params.interval))]
    pub async fn get_quote(
        &self,
        symbol: &str,
        params: &QuoteParams,
        asset_type: Option<AssetType>,
    ) -> QuoteOutcome {
        if let Some(payload) = self.cache.get(symbol, &params.range, &params.interval).await {
            return QuoteOutcome::Cached(annotate(payload, true, asset_type));
        }

        let quote = match self
            .provider
            .fetch_ticker(symbol, params.history_request())
            .await
        {
            Ok(raw) => Normalizer::normalize(&raw, params.include_history, &params.range),
            Err(e) => {
                warn!(symbol, error = %e, "Provider fetch failed");
                Normalizer::error_response(symbol, e.to_string())
            }
        };

        let payload = match quote.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                return QuoteOutcome::Failed(failure_payload(symbol, &e.to_string(), asset_type))
            }
        };

        if quote.is_error() {
            debug!(symbol, "정규화 실패, 캐시하지 않음");
            return QuoteOutcome::Failed(annotate(payload, false, asset_type));
        }

        let payload = annotate(payload, false, asset_type);
        self.cache
            .set(symbol, &payload, &params.range, &params.interval)
            .await;
        QuoteOutcome::Fetched(payload)
    }

    /// 배치 조회.
    ///
    /// 요청 순서를 유지합니다. provider 호출 자체가 실패한 항목은
    /// `"Failed to fetch: …"` 항목으로 대체되며 캐시하지 않습니다.
    /// 정규화 실패 응답은 같은 심볼의 반복 조회를 막기 위해 캐시합니다.
    #[instrument(skip(self, symbols, params), fields(count = symbols.len()))]
    pub async fn get_batch(
        &self,
        symbols: &[String],
        params: &QuoteParams,
        asset_type: Option<AssetType>,
    ) -> BatchResult {
        let mut data = Vec::with_capacity(symbols.len());
        let mut cached = 0;
        let mut fetched = 0;

        for symbol in symbols {
            if let Some(payload) = self.cache.get(symbol, &params.range, &params.interval).await {
                cached += 1;
                data.push(annotate(payload, true, asset_type));
                continue;
            }

            fetched += 1;
            let raw = match self
                .provider
                .fetch_ticker(symbol, params.history_request())
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Provider fetch failed");
                    data.push(failure_payload(
                        symbol,
                        &format!("Failed to fetch: {}", e),
                        asset_type,
                    ));
                    continue;
                }
            };

            let quote = Normalizer::normalize(&raw, params.include_history, &params.range);
            let payload = match quote.to_payload() {
                Ok(payload) => annotate(payload, false, asset_type),
                Err(e) => {
                    data.push(failure_payload(
                        symbol,
                        &format!("Failed to fetch: {}", e),
                        asset_type,
                    ));
                    continue;
                }
            };

            self.cache
                .set(symbol, &payload, &params.range, &params.interval)
                .await;
            data.push(payload);
        }

        BatchResult {
            total: data.len(),
            data,
            cached,
            fetched,
        }
    }
}

/// `cached`와 `asset_type` 필드를 덧붙입니다.
fn annotate(mut payload: Payload, cached: bool, asset_type: Option<AssetType>) -> Payload {
    payload.insert("cached".to_string(), Value::Bool(cached));
    if let Some(asset_type) = asset_type {
        payload.insert("asset_type".to_string(), json!(asset_type.as_str()));
    }
    payload
}

/// provider 실패 항목.
fn failure_payload(symbol: &str, error: &str, asset_type: Option<AssetType>) -> Payload {
    let mut payload = Payload::new();
    payload.insert("ticker".to_string(), json!(symbol));
    payload.insert("error".to_string(), json!(error));
    payload.insert("price".to_string(), json!(0));
    payload.insert("change_percent".to_string(), json!(0));
    if let Some(asset_type) = asset_type {
        payload.insert("asset_type".to_string(), json!(asset_type.as_str()));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DataError, Result};
    use crate::provider::RawTicker;
    use crate::storage::{CacheTable, MemoryCacheTable};
    use async_trait::async_trait;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 심볼별로 고정 응답을 주는 provider.
    #[derive(Default)]
    struct StubProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_ticker(
            &self,
            symbol: &str,
            _history: Option<HistoryRequest>,
        ) -> Result<RawTicker> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match symbol {
                "DOWN" => Err(DataError::FetchError("connection reset".to_string())),
                "EMPTY" => Ok(RawTicker::new(symbol, Map::new())),
                _ => {
                    let mut info = Map::new();
                    info.insert("symbol".to_string(), json!(symbol));
                    info.insert("regularMarketPrice".to_string(), json!(100.0));
                    info.insert("previousClose".to_string(), json!(80.0));
                    Ok(RawTicker::new(symbol, info))
                }
            }
        }
    }

    fn service() -> (QuoteService, Arc<StubProvider>, Arc<MemoryCacheTable>) {
        let table = Arc::new(MemoryCacheTable::new());
        let provider = Arc::new(StubProvider::default());
        let cache = Arc::new(CacheManager::new(table.clone()));
        (QuoteService::new(cache, provider.clone()), provider, table)
    }

    #[tokio::test]
    async fn test_get_quote_miss_then_hit() {
        let (svc, provider, _) = service();
        let params = QuoteParams::new("1mo", "1d");

        let first = svc.get_quote("AAPL", &params, None).await;
        let QuoteOutcome::Fetched(payload) = &first else {
            panic!("expected fetch, got {:?}", first);
        };
        assert_eq!(payload["cached"], false);
        assert_eq!(payload["change_percent"], 25.0);

        let second = svc.get_quote("AAPL", &params, None).await;
        let QuoteOutcome::Cached(payload) = &second else {
            panic!("expected cache hit, got {:?}", second);
        };
        assert_eq!(payload["cached"], true);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_quote_failure_is_not_cached() {
        let (svc, provider, table) = service();
        let params = QuoteParams::default();

        assert!(svc.get_quote("EMPTY", &params, None).await.is_failed());
        assert!(svc.get_quote("DOWN", &params, None).await.is_failed());
        assert!(table.is_empty().await);

        svc.get_quote("EMPTY", &params, None).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_asset_type_annotation() {
        let (svc, _, _) = service();
        let outcome = svc
            .get_quote("BTC-USD", &QuoteParams::default(), Some(AssetType::Crypto))
            .await;
        assert_eq!(outcome.payload()["asset_type"], "crypto");
    }

    #[tokio::test]
    async fn test_batch_counts_and_order() {
        let (svc, _, _) = service();
        let params = QuoteParams::default();
        svc.get_quote("MSFT", &params, None).await;

        let symbols: Vec<String> = ["AAPL", "MSFT", "DOWN", "EMPTY"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let result = svc.get_batch(&symbols, &params, None).await;

        assert_eq!(result.total, 4);
        assert_eq!(result.cached, 1);
        assert_eq!(result.fetched, 3);

        let tickers: Vec<&str> = result
            .data
            .iter()
            .map(|p| p["ticker"].as_str().unwrap())
            .collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT", "DOWN", "EMPTY"]);
        assert_eq!(result.data[1]["cached"], true);
        assert!(result.data[2]["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to fetch:"));
        assert_eq!(result.data[2]["price"], 0);
    }

    #[tokio::test]
    async fn test_batch_caches_normalization_failures_only() {
        let (svc, _, table) = service();
        let symbols = vec!["EMPTY".to_string(), "DOWN".to_string()];

        svc.get_batch(&symbols, &QuoteParams::default(), None).await;

        assert_eq!(table.keys().await, vec!["yf:EMPTY:1d:1d"]);
        let stored = table.get("yf:EMPTY:1d:1d").await.unwrap().unwrap();
        assert!(stored.data.contains_key("error"));
    }
}

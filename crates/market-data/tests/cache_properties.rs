//! 캐시 매니저 통합 테스트.
//!
//! 인메모리 테이블 위에서 키 파생, TTL 계층, 만료, 무효화, 정리,
//! fail-open 동작을 end-to-end로 검증합니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use market_core::Payload;
use market_data::{
    CacheManager, CacheRecord, CacheTable, DataError, HistoryRequest, MarketDataProvider,
    MemoryCacheTable, QuoteOutcome, QuoteParams, QuoteService, RawTicker, Result,
};
use serde_json::{json, Map};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn payload(ticker: &str, price: f64) -> Payload {
    let mut map = Payload::new();
    map.insert("ticker".to_string(), json!(ticker));
    map.insert("price".to_string(), json!(price));
    map
}

fn setup() -> (CacheManager, Arc<MemoryCacheTable>) {
    let table = Arc::new(MemoryCacheTable::new());
    (CacheManager::new(table.clone()), table)
}

#[test]
fn key_derivation_ignores_symbol_case() {
    let (cache, _) = setup();
    assert_eq!(
        cache.derive_key("aapl", "1d", "1d"),
        cache.derive_key("AAPL", "1d", "1d")
    );
}

#[test]
fn allow_listed_symbols_get_short_ttl() {
    let (cache, _) = setup();
    assert_eq!(cache.ttl_for("AAPL").as_secs(), 300);
    assert_eq!(cache.ttl_for("BTC-USD").as_secs(), 300);
    assert_eq!(cache.ttl_for("IBM").as_secs(), 600);
}

#[tokio::test]
async fn second_write_wins() {
    let (cache, table) = setup();

    let first = cache
        .try_set("IBM", &payload("IBM", 1.0), "1d", "1d")
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let second = cache
        .try_set("IBM", &payload("IBM", 2.0), "1d", "1d")
        .await
        .unwrap();

    assert!(second >= first);
    assert_eq!(table.len().await, 1);

    let stored = table.get("yf:IBM:1d:1d").await.unwrap().unwrap();
    assert_eq!(stored.expires_at, second);
    assert_eq!(stored.data["price"], 2.0);
}

#[tokio::test]
async fn set_then_get_round_trips_payload() {
    let (cache, _) = setup();
    let data = payload("AAPL", 185.23);

    assert!(cache.set("AAPL", &data, "1mo", "1d").await);
    assert_eq!(cache.get("AAPL", "1mo", "1d").await, Some(data));
}

#[tokio::test]
async fn expired_entry_is_absent_and_removed() {
    let (cache, table) = setup();
    table
        .upsert(CacheRecord::new(
            "yf:AAPL:1d:1d",
            payload("AAPL", 1.0),
            Utc::now() - Duration::seconds(1),
        ))
        .await
        .unwrap();

    assert!(cache.get("AAPL", "1d", "1d").await.is_none());
    assert!(table.is_empty().await);
}

#[tokio::test]
async fn invalidate_removes_only_that_symbol() {
    let (cache, table) = setup();
    for (symbol, range) in [("AAPL", "1d"), ("AAPL", "1mo"), ("AAPLX", "1d"), ("MSFT", "1d")] {
        cache.set(symbol, &payload(symbol, 1.0), range, "1d").await;
    }

    assert_eq!(cache.invalidate("aapl").await, 2);
    assert_eq!(
        table.keys().await,
        vec!["yf:AAPLX:1d:1d".to_string(), "yf:MSFT:1d:1d".to_string()]
    );
}

#[tokio::test]
async fn sweep_removes_exactly_the_expired_rows() {
    let (cache, table) = setup();
    let now = Utc::now();
    for (id, offset) in [("a", -60), ("b", -1), ("c", 60), ("d", 600)] {
        table
            .upsert(CacheRecord::new(
                id,
                Payload::new(),
                now + Duration::seconds(offset),
            ))
            .await
            .unwrap();
    }

    assert_eq!(cache.sweep().await, 2);
    assert_eq!(table.keys().await, vec!["c".to_string(), "d".to_string()]);
    assert_eq!(cache.sweep().await, 0);
}

/// 항상 실패하는 테이블.
struct UnavailableTable;

#[async_trait]
impl CacheTable for UnavailableTable {
    async fn get(&self, _id: &str) -> Result<Option<CacheRecord>> {
        Err(DataError::PoolExhausted)
    }
    async fn upsert(&self, _record: CacheRecord) -> Result<()> {
        Err(DataError::PoolExhausted)
    }
    async fn delete(&self, _id: &str) -> Result<bool> {
        Err(DataError::PoolExhausted)
    }
    async fn delete_by_prefix(&self, _prefix: &str) -> Result<usize> {
        Err(DataError::PoolExhausted)
    }
    async fn delete_expired(&self, _before: DateTime<Utc>) -> Result<usize> {
        Err(DataError::PoolExhausted)
    }
    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}

#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl MarketDataProvider for CountingProvider {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn fetch_ticker(
        &self,
        symbol: &str,
        _history: Option<HistoryRequest>,
    ) -> Result<RawTicker> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut info = Map::new();
        info.insert("symbol".to_string(), json!(symbol));
        info.insert("regularMarketPrice".to_string(), json!(42.0));
        Ok(RawTicker::new(symbol, info))
    }
}

#[tokio::test]
async fn unavailable_table_degrades_to_provider() {
    let cache = Arc::new(CacheManager::new(Arc::new(UnavailableTable)));

    assert!(cache.get("AAPL", "1d", "1d").await.is_none());
    assert!(!cache.set("AAPL", &payload("AAPL", 1.0), "1d", "1d").await);
    assert_eq!(cache.invalidate("AAPL").await, 0);
    assert_eq!(cache.sweep().await, 0);

    let provider = Arc::new(CountingProvider::default());
    let service = QuoteService::new(cache, provider.clone());
    let params = QuoteParams::default();

    for _ in 0..2 {
        let outcome = service.get_quote("AAPL", &params, None).await;
        let QuoteOutcome::Fetched(data) = outcome else {
            panic!("expected a fetched quote");
        };
        assert_eq!(data["price"], 42.0);
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

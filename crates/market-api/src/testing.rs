//! 테스트용 provider.

use async_trait::async_trait;
use market_data::{DataError, HistoryRequest, MarketDataProvider, RawTicker, Result};
use serde_json::{json, Map};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 네트워크 없이 고정 시세를 반환하는 provider.
///
/// - `failing`에 포함된 심볼: `DataError::FetchError`
/// - `unknown`에 포함된 심볼: 빈 메타데이터 (정규화 실패)
/// - 그 외: 현재가 100, 전일 종가 80
#[derive(Debug, Default)]
pub struct StubProvider {
    failing: HashSet<String>,
    unknown: HashSet<String>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(symbols.into_iter().map(Into::into));
        self
    }

    pub fn unknown<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unknown.extend(symbols.into_iter().map(Into::into));
        self
    }

    /// 지금까지의 `fetch_ticker` 호출 횟수.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
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

        if self.failing.contains(symbol) {
            return Err(DataError::FetchError(format!("upstream unavailable for {}", symbol)));
        }
        if self.unknown.contains(symbol) {
            return Ok(RawTicker::new(symbol, Map::new()));
        }

        let mut info = Map::new();
        info.insert("symbol".to_string(), json!(symbol));
        info.insert("shortName".to_string(), json!(format!("{} Stub", symbol)));
        info.insert("regularMarketPrice".to_string(), json!(100.0));
        info.insert("previousClose".to_string(), json!(80.0));
        info.insert("currency".to_string(), json!("USD"));
        Ok(RawTicker::new(symbol, info))
    }
}

/// 라우터에 요청을 보내고 상태 코드와 JSON 본문을 반환합니다.
#[cfg(test)]
pub(crate) async fn send(
    app: axum::Router,
    method: axum::http::Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

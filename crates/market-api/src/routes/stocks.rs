//! 다중 종목 시세 endpoint.
//!
//! POST /api/v1/stocks

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use market_data::BatchResult;
use serde::Deserialize;
use std::sync::Arc;

use super::request::{parse_symbols, QuoteOptions, SymbolList};
use crate::error::{ApiResult, QuoteApiError};
use crate::metrics::record_batch_size;
use crate::state::AppState;

/// 다중 종목 기본 조회 기간.
pub const STOCKS_DEFAULT_RANGE: &str = "1d";

/// 다중 종목 조회 요청.
///
/// `tickers`는 `"AAPL,MSFT"` 또는 `["AAPL", "MSFT"]`.
#[derive(Debug, Deserialize)]
pub struct StocksRequest {
    pub tickers: Option<SymbolList>,
    #[serde(flatten)]
    pub options: QuoteOptions,
}

/// 다중 종목 시세 조회.
///
/// 모든 심볼이 검증을 통과해야 캐시/provider에 접근합니다.
/// 개별 조회 실패는 200 응답의 항목으로 포함됩니다.
pub async fn get_stocks(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StocksRequest>, JsonRejection>,
) -> ApiResult<Json<BatchResult>> {
    let Json(request) = body.map_err(QuoteApiError::from)?;

    let tickers = request
        .tickers
        .ok_or(QuoteApiError::MissingParameter("tickers"))?;
    let symbols = parse_symbols(tickers)?;
    let params = request.options.into_params(STOCKS_DEFAULT_RANGE);

    record_batch_size("stocks", symbols.len());
    let result = state.quotes.get_batch(&symbols, &params, None).await;
    Ok(Json(result))
}

/// 다중 종목 라우터 생성.
pub fn stocks_router() -> Router<Arc<AppState>> {
    Router::new().route("/stocks", post(get_stocks))
}

#[cfg(test)]
mod tests {
    use crate::routes::create_api_router;
    use crate::state::create_test_state_with;
    use crate::testing::{send, StubProvider};
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    fn app(provider: Arc<StubProvider>) -> axum::Router {
        create_api_router().with_state(Arc::new(create_test_state_with(provider)))
    }

    #[tokio::test]
    async fn test_stocks_comma_separated() {
        let provider = Arc::new(StubProvider::new());
        let (status, body) = send(
            app(provider.clone()),
            Method::POST,
            "/api/v1/stocks",
            Some(json!({"tickers": "aapl, msft"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["fetched"], 2);
        assert_eq!(body["cached"], 0);
        assert_eq!(body["data"][0]["ticker"], "AAPL");
        assert_eq!(body["data"][1]["ticker"], "MSFT");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_stocks_invalid_symbol_rejects_whole_batch() {
        let provider = Arc::new(StubProvider::new());
        let state = Arc::new(create_test_state_with(provider.clone()));
        let app = create_api_router().with_state(state.clone());

        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/stocks",
            Some(json!({"tickers": ["AAPL", "???"]})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SYMBOL");
        assert_eq!(provider.calls(), 0);
        assert!(state.cache.get("AAPL", "1d", "1d").await.is_none());
    }

    #[tokio::test]
    async fn test_stocks_limit() {
        let tickers: Vec<String> = (0..51).map(|i| format!("T{}", i)).collect();
        let (status, body) = send(
            app(Arc::new(StubProvider::new())),
            Method::POST,
            "/api/v1/stocks",
            Some(json!({ "tickers": tickers })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "TOO_MANY_SYMBOLS");
    }

    #[tokio::test]
    async fn test_stocks_partial_failure_and_cache_counts() {
        let provider = Arc::new(StubProvider::new().failing(["DOWN"]));
        let app = app(provider.clone());

        send(
            app.clone(),
            Method::POST,
            "/api/v1/stocks",
            Some(json!({"tickers": ["AAPL"]})),
        )
        .await;

        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/stocks",
            Some(json!({"tickers": ["AAPL", "DOWN"]})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["cached"], 1);
        assert_eq!(body["fetched"], 1);
        assert_eq!(body["data"][0]["cached"], true);
        assert!(body["data"][1]["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to fetch:"));
    }

    #[tokio::test]
    async fn test_stocks_missing_tickers() {
        let (status, body) = send(
            app(Arc::new(StubProvider::new())),
            Method::POST,
            "/api/v1/stocks",
            Some(json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_PARAMETER");
    }
}

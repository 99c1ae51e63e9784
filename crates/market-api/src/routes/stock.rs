//! 단일 종목 시세 endpoint.
//!
//! POST /api/v1/stock

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use market_core::Payload;
use market_data::QuoteOutcome;
use serde::Deserialize;
use std::sync::Arc;

use super::request::{parse_symbol, QuoteOptions};
use crate::error::{ApiResult, QuoteApiError};
use crate::metrics::record_quote;
use crate::state::AppState;

/// 단일 종목 기본 조회 기간.
pub const STOCK_DEFAULT_RANGE: &str = "1mo";

/// 단일 종목 조회 요청.
#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub ticker: Option<String>,
    #[serde(flatten)]
    pub options: QuoteOptions,
}

/// 시세 조회 결과를 HTTP 응답으로 변환합니다.
///
/// 실패 페이로드는 404로 그대로 반환됩니다.
pub(crate) fn outcome_response(
    endpoint: &'static str,
    outcome: QuoteOutcome,
) -> (StatusCode, Json<Payload>) {
    match outcome {
        QuoteOutcome::Cached(payload) => {
            record_quote(endpoint, "cached");
            (StatusCode::OK, Json(payload))
        }
        QuoteOutcome::Fetched(payload) => {
            record_quote(endpoint, "fetched");
            (StatusCode::OK, Json(payload))
        }
        QuoteOutcome::Failed(payload) => {
            record_quote(endpoint, "failed");
            (StatusCode::NOT_FOUND, Json(payload))
        }
    }
}

/// 단일 종목 시세 조회.
///
/// POST /api/v1/stock
pub async fn get_stock(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StockRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Payload>)> {
    let Json(request) = body.map_err(QuoteApiError::from)?;

    let raw = request
        .ticker
        .ok_or(QuoteApiError::MissingParameter("ticker"))?;
    let symbol = parse_symbol(&raw)?;
    let params = request.options.into_params(STOCK_DEFAULT_RANGE);

    let outcome = state.quotes.get_quote(&symbol, &params, None).await;
    Ok(outcome_response("stock", outcome))
}

/// 단일 종목 라우터 생성.
pub fn stock_router() -> Router<Arc<AppState>> {
    Router::new().route("/stock", post(get_stock))
}

#[cfg(test)]
mod tests {
    use crate::routes::create_api_router;
    use crate::state::create_test_state_with;
    use crate::testing::{send, StubProvider};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(provider: Arc<StubProvider>) -> axum::Router {
        create_api_router().with_state(Arc::new(create_test_state_with(provider)))
    }

    #[tokio::test]
    async fn test_stock_miss_then_hit() {
        let provider = Arc::new(StubProvider::new());
        let app = app(provider.clone());

        let (status, body) = send(
            app.clone(),
            Method::POST,
            "/api/v1/stock",
            Some(json!({"ticker": "aapl"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticker"], "AAPL");
        assert_eq!(body["cached"], false);
        assert_eq!(body["change_percent"], 25.0);

        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/stock",
            Some(json!({"ticker": "AAPL"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cached"], true);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_stock_missing_ticker() {
        let provider = Arc::new(StubProvider::new());
        let (status, body) = send(
            app(provider.clone()),
            Method::POST,
            "/api/v1/stock",
            Some(json!({"range": "1d"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_PARAMETER");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_stock_invalid_ticker() {
        let provider = Arc::new(StubProvider::new());
        let (status, body) = send(
            app(provider.clone()),
            Method::POST,
            "/api/v1/stock",
            Some(json!({"ticker": "TOOLONGTICKER123"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SYMBOL");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_stock_unknown_symbol_is_404_and_not_cached() {
        let provider = Arc::new(StubProvider::new().unknown(["ZZZZ"]));
        let app = app(provider.clone());

        for _ in 0..2 {
            let (status, body) = send(
                app.clone(),
                Method::POST,
                "/api/v1/stock",
                Some(json!({"ticker": "ZZZZ"})),
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["ticker"], "ZZZZ");
            assert_eq!(body["price"], 0.0);
            assert!(body["error"].is_string());
        }
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_stock_malformed_json_is_400() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/stock")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"ticker\":"))
            .unwrap();

        let response = app(Arc::new(StubProvider::new()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "INVALID_INPUT");
    }
}

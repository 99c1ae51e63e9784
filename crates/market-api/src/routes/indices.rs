//! 시장 지수 시세 endpoint.
//!
//! GET/POST /api/v1/indices

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::get,
    Json, Router,
};
use market_core::{normalize_symbol, AssetType};
use market_data::{BatchResult, QuoteParams};
use serde::Deserialize;
use std::sync::Arc;

use super::request::{parse_symbol, QuoteOptions, SymbolList, MAX_BATCH_SYMBOLS};
use crate::error::{ApiResult, QuoteApiError};
use crate::metrics::record_batch_size;
use crate::state::AppState;

/// 지수 기본 조회 기간.
pub const INDICES_DEFAULT_RANGE: &str = "1d";

/// 주요 지수 이름 → Yahoo 티커.
pub const MAJOR_INDICES: &[(&str, &str)] = &[
    ("SP500", "^GSPC"),
    ("NASDAQ", "^IXIC"),
    ("DOW", "^DJI"),
    ("FTSE", "^FTSE"),
    ("DAX", "^GDAXI"),
    ("NIKKEI", "^N225"),
    ("HANGSENG", "^HSI"),
    ("CAC40", "^FCHI"),
    ("SENSEX", "^BSESN"),
    ("ASX200", "^AXJO"),
];

/// 지수 조회 요청 (POST 본문).
#[derive(Debug, Default, Deserialize)]
pub struct IndicesRequest {
    pub indices: Option<SymbolList>,
    pub index: Option<SymbolList>,
    #[serde(flatten)]
    pub options: QuoteOptions,
}

/// 지수 조회 쿼리 (GET).
#[derive(Debug, Default, Deserialize)]
pub struct IndicesQuery {
    /// 쉼표 구분 지수 목록
    pub indices: Option<String>,
    pub index: Option<String>,
    pub range: Option<String>,
    pub interval: Option<String>,
}

/// 지수 이름 또는 `^` 티커 목록을 Yahoo 티커로 변환합니다.
///
/// 목록이 없거나 비어 있으면 주요 지수 전체를 반환합니다.
pub fn resolve_indices(list: Option<SymbolList>) -> Result<Vec<String>, QuoteApiError> {
    let names: Vec<String> = list
        .map(SymbolList::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Ok(MAJOR_INDICES
            .iter()
            .map(|(_, ticker)| ticker.to_string())
            .collect());
    }
    if names.len() > MAX_BATCH_SYMBOLS {
        return Err(QuoteApiError::TooManySymbols(MAX_BATCH_SYMBOLS));
    }

    names
        .iter()
        .map(|name| {
            let upper = normalize_symbol(name);
            if let Some((_, ticker)) = MAJOR_INDICES.iter().find(|(n, _)| *n == upper) {
                Ok(ticker.to_string())
            } else if upper.starts_with('^') {
                parse_symbol(&upper)
            } else {
                Err(QuoteApiError::Unsupported {
                    kind: "index",
                    name: name.clone(),
                })
            }
        })
        .collect()
}

async fn fetch_indices(state: &AppState, tickers: Vec<String>, params: QuoteParams) -> BatchResult {
    record_batch_size("indices", tickers.len());
    state
        .quotes
        .get_batch(&tickers, &params, Some(AssetType::Index))
        .await
}

/// 지수 시세 조회 (쿼리 파라미터).
///
/// GET /api/v1/indices?indices=SP500,DOW
pub async fn list_indices(
    State(state): State<Arc<AppState>>,
    query: Result<Query<IndicesQuery>, QueryRejection>,
) -> ApiResult<Json<BatchResult>> {
    let Query(query) = query.map_err(QuoteApiError::from)?;

    let list = query.indices.or(query.index).map(SymbolList::Joined);
    let tickers = resolve_indices(list)?;
    let params = QuoteOptions {
        range: query.range,
        interval: query.interval,
        include_history: false,
    }
    .into_params(INDICES_DEFAULT_RANGE);

    Ok(Json(fetch_indices(&state, tickers, params).await))
}

/// 지수 시세 조회 (JSON 본문).
///
/// POST /api/v1/indices
pub async fn query_indices(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IndicesRequest>, JsonRejection>,
) -> ApiResult<Json<BatchResult>> {
    let Json(request) = body.map_err(QuoteApiError::from)?;

    let tickers = resolve_indices(request.indices.or(request.index))?;
    let params = request.options.into_params(INDICES_DEFAULT_RANGE);

    Ok(Json(fetch_indices(&state, tickers, params).await))
}

/// 지수 라우터 생성.
pub fn indices_router() -> Router<Arc<AppState>> {
    Router::new().route("/indices", get(list_indices).post(query_indices))
}

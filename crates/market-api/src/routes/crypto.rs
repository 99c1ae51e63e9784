//! 암호화폐 시세 endpoint.
//!
//! POST /api/v1/crypto

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use market_core::{normalize_symbol, AssetType, Payload};
use serde::Deserialize;
use std::sync::Arc;

use super::request::{parse_symbol, QuoteOptions};
use super::stock::outcome_response;
use crate::error::{ApiResult, QuoteApiError};
use crate::state::AppState;

/// 암호화폐 기본 조회 기간.
pub const CRYPTO_DEFAULT_RANGE: &str = "1mo";

/// `-USD` 접미사 없이 요청할 수 있는 기본 심볼.
pub const SUPPORTED_CRYPTO: &[&str] = &[
    "BTC", "ETH", "BNB", "XRP", "ADA", "SOL", "DOGE", "MATIC", "DOT", "AVAX", "SHIB", "LTC",
    "UNI", "LINK", "XLM", "ALGO", "ATOM", "NEAR", "FTM", "APE",
];

/// 암호화폐 조회 요청.
#[derive(Debug, Deserialize)]
pub struct CryptoRequest {
    pub symbol: Option<String>,
    #[serde(flatten)]
    pub options: QuoteOptions,
}

/// 요청 심볼을 Yahoo 거래쌍 심볼로 변환합니다.
///
/// `BTC` → `BTC-USD`. 이미 `-`가 포함되어 있으면 그대로 검증합니다.
pub fn resolve_crypto_symbol(raw: &str) -> Result<String, QuoteApiError> {
    let base = normalize_symbol(raw);
    if base.contains('-') {
        return parse_symbol(&base);
    }
    if !SUPPORTED_CRYPTO.contains(&base.as_str()) {
        return Err(QuoteApiError::Unsupported {
            kind: "crypto symbol",
            name: format!("{}. Use format like BTC-USD", raw),
        });
    }
    parse_symbol(&format!("{}-USD", base))
}

/// 암호화폐 시세 조회.
///
/// POST /api/v1/crypto
pub async fn get_crypto(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CryptoRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Payload>)> {
    let Json(request) = body.map_err(QuoteApiError::from)?;

    let raw = request
        .symbol
        .ok_or(QuoteApiError::MissingParameter("symbol"))?;
    let symbol = resolve_crypto_symbol(&raw)?;
    let params = request.options.into_params(CRYPTO_DEFAULT_RANGE);

    let outcome = state
        .quotes
        .get_quote(&symbol, &params, Some(AssetType::Crypto))
        .await;
    Ok(outcome_response("crypto", outcome))
}

/// 암호화폐 라우터 생성.
pub fn crypto_router() -> Router<Arc<AppState>> {
    Router::new().route("/crypto", post(get_crypto))
}

//! API 에러 응답 타입.
//!
//! 모든 엔드포인트에서 일관된 에러 형식을 제공합니다.
//! 정규화 실패(404)는 이 형식이 아니라 실패 페이로드 자체를 반환합니다.

use std::any::Any;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "INVALID_SYMBOL",
///   "message": "Invalid ticker symbol: ???",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_INPUT", "INTERNAL_ERROR")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 에러 발생 타임스탬프 (Unix timestamp, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    ///
    /// ```
    /// use market_api::error::ApiErrorResponse;
    ///
    /// let error = ApiErrorResponse::new("INVALID_SYMBOL", "Invalid ticker symbol: ???");
    /// assert!(error.timestamp.is_some());
    /// ```
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 시세 엔드포인트 에러.
#[derive(Debug, Error)]
pub enum QuoteApiError {
    /// 필수 파라미터 누락
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// 형식이 잘못된 심볼
    #[error("Invalid ticker symbol: {0}")]
    InvalidSymbol(String),

    /// 지원하지 않는 암호화폐 또는 지수 이름
    #[error("Unsupported {kind}: {name}")]
    Unsupported { kind: &'static str, name: String },

    /// 배치 요청 한도 초과
    #[error("Maximum {0} tickers per request")]
    TooManySymbols(usize),

    /// 요청 본문 파싱 실패
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// 처리되지 않은 내부 오류
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl QuoteApiError {
    /// 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            QuoteApiError::MissingParameter(_) => "MISSING_PARAMETER",
            QuoteApiError::InvalidSymbol(_) => "INVALID_SYMBOL",
            QuoteApiError::Unsupported { .. } => "UNSUPPORTED_SYMBOL",
            QuoteApiError::TooManySymbols(_) => "TOO_MANY_SYMBOLS",
            QuoteApiError::InvalidBody(_) => "INVALID_INPUT",
            QuoteApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP 상태 코드.
    pub fn status(&self) -> StatusCode {
        match self {
            QuoteApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<QuoteApiError> for (StatusCode, Json<ApiErrorResponse>) {
    fn from(err: QuoteApiError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(error = %err, "Unhandled error in quote handler");
        }
        (status, Json(ApiErrorResponse::new(err.code(), err.to_string())))
    }
}

impl From<JsonRejection> for QuoteApiError {
    fn from(rejection: JsonRejection) -> Self {
        QuoteApiError::InvalidBody(rejection.body_text())
    }
}

impl From<QueryRejection> for QuoteApiError {
    fn from(rejection: QueryRejection) -> Self {
        QuoteApiError::InvalidBody(rejection.body_text())
    }
}

/// 핸들러 패닉을 `INTERNAL_ERROR` 응답으로 변환합니다.
///
/// `tower_http::catch_panic::CatchPanicLayer::custom`에 전달합니다.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "handler panicked".to_string()
    };

    <(StatusCode, Json<ApiErrorResponse>)>::from(QuoteApiError::Internal(detail)).into_response()
}

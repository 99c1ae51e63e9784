//! 정규화된 시세 타입.
//!
//! 이 모듈은 provider 응답과 무관한 고정 출력 스키마를 정의합니다:
//! - `QuoteSnapshot` - 정상 시세 스냅샷
//! - `QuoteFailure` - 정규화 실패 시의 축약된 에러 형태
//! - `NormalizedQuote` - 둘 중 하나
//! - `HistoryRecord` - 기간별 OHLCV 레코드
//!
//! 캐시에는 `Payload`(JSON 객체) 형태로 저장됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// 캐시에 저장되는 불투명 페이로드 (문자열 → JSON 값 매핑).
pub type Payload = Map<String, Value>;

/// 금액 필드를 소수점 둘째 자리로 반올림합니다.
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 기간별 가격 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// 기간 시작 시각
    pub timestamp: DateTime<Utc>,
    /// 종가
    pub price: f64,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 거래량 (없으면 0)
    pub volume: u64,
}

/// 정상 시세 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub ticker: String,
    pub name: String,
    /// 현재가
    pub price: f64,
    /// 전일 종가 대비 변동률 (%)
    pub change_percent: f64,
    pub open: f64,
    /// 전일 종가
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub currency: String,
    pub market_cap: Option<u64>,
    /// 스냅샷 생성 시각 (시장 시각이 아님)
    pub timestamp: DateTime<Utc>,
    /// 과거 데이터 (요청된 경우에만, 오래된 것부터)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryRecord>>,
}

/// 정규화 실패 응답.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteFailure {
    pub ticker: String,
    pub error: String,
    pub price: f64,
    pub change_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl QuoteFailure {
    /// 새 실패 응답을 생성합니다. 가격 필드는 0으로 고정됩니다.
    pub fn new(ticker: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            error: error.into(),
            price: 0.0,
            change_percent: 0.0,
            timestamp: Utc::now(),
        }
    }
}

/// Normalizer 출력.
///
/// 직렬화 시 태그 없이 각 variant의 필드가 그대로 노출됩니다.
/// `error` 필드 유무로 두 형태를 구분합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedQuote {
    Failed(QuoteFailure),
    Snapshot(QuoteSnapshot),
}

impl NormalizedQuote {
    /// 에러 variant인지 확인합니다.
    pub fn is_error(&self) -> bool {
        matches!(self, NormalizedQuote::Failed(_))
    }

    pub fn ticker(&self) -> &str {
        match self {
            NormalizedQuote::Failed(f) => &f.ticker,
            NormalizedQuote::Snapshot(s) => &s.ticker,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            NormalizedQuote::Failed(f) => f.price,
            NormalizedQuote::Snapshot(s) => s.price,
        }
    }

    /// 캐시 저장용 JSON 객체로 변환합니다.
    pub fn to_payload(&self) -> CoreResult<Payload> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Serialization(format!(
                "quote did not serialize to an object: {}",
                other
            ))),
        }
    }
}

impl From<QuoteSnapshot> for NormalizedQuote {
    fn from(snapshot: QuoteSnapshot) -> Self {
        NormalizedQuote::Snapshot(snapshot)
    }
}

impl From<QuoteFailure> for NormalizedQuote {
    fn from(failure: QuoteFailure) -> Self {
        NormalizedQuote::Failed(failure)
    }
}

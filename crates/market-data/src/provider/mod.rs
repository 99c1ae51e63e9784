//! 시세 데이터 Provider 모듈.
//!
//! 외부 시세 소스에서 원시(raw) 티커 데이터를 가져오는 추상화입니다.
//! Provider는 정규화를 하지 않습니다. 응답의 메타데이터를 그대로
//! `info` 맵으로 넘기고, 정규화는 [`crate::normalizer`]가 담당합니다.
//!
//! ## Yahoo Finance
//! - `YahooProvider`: `/v8/finance/chart/{symbol}` 엔드포인트 클라이언트

pub mod yahoo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub use yahoo::YahooProvider;

/// 과거 데이터 요청 범위.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// 조회 기간 (예: `1d`, `5d`, `1mo`, `1y`)
    pub range: String,
    /// 봉 간격 (예: `1m`, `1h`, `1d`)
    pub interval: String,
}

impl HistoryRequest {
    pub fn new(range: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            interval: interval.into(),
        }
    }
}

/// 한 기간의 원시 OHLCV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPeriod {
    /// 기간 시작 시각
    pub start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

/// Provider가 반환하는 원시 티커 레코드.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTicker {
    /// 요청한 심볼
    pub symbol: String,
    /// provider 메타데이터 (키 이름은 provider 고유)
    pub info: Map<String, Value>,
    /// 기간별 데이터 (요청하지 않았으면 비어 있음)
    pub history: Vec<RawPeriod>,
}

impl RawTicker {
    pub fn new(symbol: impl Into<String>, info: Map<String, Value>) -> Self {
        Self {
            symbol: symbol.into(),
            info,
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<RawPeriod>) -> Self {
        self.history = history;
        self
    }
}

/// 시세 데이터 Provider.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider 이름 (로그/헬스 체크용).
    fn name(&self) -> &'static str;

    /// 심볼의 원시 데이터를 가져옵니다.
    ///
    /// `history`가 `None`이면 메타데이터만 채워집니다.
    async fn fetch_ticker(
        &self,
        symbol: &str,
        history: Option<HistoryRequest>,
    ) -> Result<RawTicker>;
}

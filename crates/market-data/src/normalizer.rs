//! 원시 provider 데이터를 고정 스키마로 정규화합니다.
//!
//! 필드마다 후보 키를 순서대로 확인하며, 값이 없거나 `null`이거나 0이면
//! 다음 후보로 넘어갑니다. 전일 종가만은 예외로, 명시된 0을 그대로 사용합니다. 정규화는 전역적(total)입니다: 어떤 입력이든
//! 패닉 없이 [`NormalizedQuote`]를 반환하고, 결함은 `Failed` variant가 됩니다.

use chrono::Utc;
use market_core::{round_price, HistoryRecord, NormalizedQuote, QuoteFailure, QuoteSnapshot};
use serde_json::{Map, Value};
use tracing::debug;

use crate::provider::{RawPeriod, RawTicker};

pub use market_core::validate_symbol;

const PRICE_KEYS: &[&str] = &["regularMarketPrice", "currentPrice"];
const PREVIOUS_CLOSE_KEYS: &[&str] = &[
    "previousClose",
    "regularMarketPreviousClose",
    "chartPreviousClose",
];
const OPEN_KEYS: &[&str] = &["regularMarketOpen", "open"];
const HIGH_KEYS: &[&str] = &["dayHigh", "regularMarketDayHigh"];
const LOW_KEYS: &[&str] = &["dayLow", "regularMarketDayLow"];
const VOLUME_KEYS: &[&str] = &["volume", "regularMarketVolume"];
const NAME_KEYS: &[&str] = &["longName", "shortName"];

const DEFAULT_CURRENCY: &str = "USD";

/// 시세 정규화기. 상태가 없습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    /// 원시 티커를 정규화합니다.
    ///
    /// `include_history`가 참이고 원시 레코드에 기간 데이터가 있을 때만
    /// `history`가 채워집니다.
    pub fn normalize(raw: &RawTicker, include_history: bool, range: &str) -> NormalizedQuote {
        debug!(symbol = %raw.symbol, include_history, range, "시세 정규화");

        match Self::build_snapshot(raw, include_history) {
            Ok(snapshot) => snapshot.into(),
            Err(error) => Self::error_response(&raw.symbol, error),
        }
    }

    /// 여러 티커를 입력 순서대로 정규화합니다.
    pub fn normalize_many(
        raws: &[RawTicker],
        include_history: bool,
        range: &str,
    ) -> Vec<NormalizedQuote> {
        raws.iter()
            .map(|raw| Self::normalize(raw, include_history, range))
            .collect()
    }

    /// 기간 데이터를 오래된 것부터 정렬된 레코드로 변환합니다.
    pub fn normalize_history(series: &[RawPeriod]) -> Vec<HistoryRecord> {
        let mut records: Vec<HistoryRecord> = series
            .iter()
            .map(|period| HistoryRecord {
                timestamp: period.start,
                price: round_price(period.close),
                open: round_price(period.open),
                high: round_price(period.high),
                low: round_price(period.low),
                volume: period.volume.unwrap_or(0),
            })
            .collect();
        records.sort_by_key(|r| r.timestamp);
        records
    }

    /// 실패 응답을 생성합니다.
    pub fn error_response(ticker: &str, error: impl Into<String>) -> NormalizedQuote {
        QuoteFailure::new(ticker, error).into()
    }

    fn build_snapshot(raw: &RawTicker, include_history: bool) -> Result<QuoteSnapshot, String> {
        let info = &raw.info;
        if info.is_empty() {
            return Err(format!("No data found for {}", raw.symbol));
        }

        let price = first_number(info, PRICE_KEYS)?.unwrap_or(0.0);
        let previous_close = first_present(info, PREVIOUS_CLOSE_KEYS)?.unwrap_or(price);
        let change_percent = if previous_close > 0.0 {
            (price - previous_close) / previous_close * 100.0
        } else {
            0.0
        };

        let open = first_number(info, OPEN_KEYS)?.unwrap_or(0.0);
        let high = first_number(info, HIGH_KEYS)?.unwrap_or(0.0);
        let low = first_number(info, LOW_KEYS)?.unwrap_or(0.0);
        let volume = first_number(info, VOLUME_KEYS)?
            .map(|v| to_count("volume", v))
            .transpose()?
            .unwrap_or(0);
        let market_cap = number(info, "marketCap")?
            .map(|v| to_count("marketCap", v))
            .transpose()?;

        let history = if include_history && !raw.history.is_empty() {
            Some(Self::normalize_history(&raw.history))
        } else {
            None
        };

        Ok(QuoteSnapshot {
            ticker: first_string(info, &["symbol"]).unwrap_or_else(|| raw.symbol.clone()),
            name: first_string(info, NAME_KEYS).unwrap_or_default(),
            price: round_price(price),
            change_percent: round_price(change_percent),
            open: round_price(open),
            close: round_price(previous_close),
            high: round_price(high),
            low: round_price(low),
            volume,
            currency: first_string(info, &["currency"])
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            market_cap,
            timestamp: Utc::now(),
            history,
        })
    }
}

/// 단일 키의 숫자 값. 없거나 `null`이면 `None`.
fn number(info: &Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    match info.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(format!("Invalid value for {}: not a finite number", key)),
        },
        Some(other) => Err(format!("Invalid value for {}: expected number, got {}", key, other)),
    }
}

/// 후보 키 중 처음으로 0이 아닌 숫자 값.
fn first_number(info: &Map<String, Value>, keys: &[&str]) -> Result<Option<f64>, String> {
    for key in keys {
        if let Some(v) = number(info, key)? {
            if v != 0.0 {
                return Ok(Some(v));
            }
        }
    }
    Ok(None)
}

/// 후보 키 중 처음으로 존재하는 숫자 값. 0도 유효한 값으로 취급합니다.
fn first_present(info: &Map<String, Value>, keys: &[&str]) -> Result<Option<f64>, String> {
    for key in keys {
        if let Some(v) = number(info, key)? {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

/// 후보 키 중 처음으로 비어 있지 않은 문자열 값.
fn first_string(info: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| info.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn to_count(key: &str, value: f64) -> Result<u64, String> {
    if value < 0.0 {
        return Err(format!("Invalid value for {}: negative", key));
    }
    Ok(value.round() as u64)
}

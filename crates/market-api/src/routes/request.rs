//! 시세 엔드포인트 공통 요청 타입과 검증.

use market_core::{normalize_symbol, validate_symbol};
use market_data::QuoteParams;
use serde::Deserialize;

use crate::error::QuoteApiError;

/// 기본 봉 간격.
pub const DEFAULT_INTERVAL: &str = "1d";

/// 배치 요청 최대 심볼 수.
pub const MAX_BATCH_SYMBOLS: usize = 50;

/// 쉼표 구분 문자열 또는 문자열 배열.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SymbolList {
    Joined(String),
    List(Vec<String>),
}

impl SymbolList {
    /// 개별 항목으로 분리합니다. 공백은 제거되고 빈 항목은 유지됩니다.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            SymbolList::Joined(s) => s.split(',').map(|t| t.trim().to_string()).collect(),
            SymbolList::List(v) => v.into_iter().map(|t| t.trim().to_string()).collect(),
        }
    }
}

/// range/interval/include_history 옵션.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteOptions {
    pub range: Option<String>,
    pub interval: Option<String>,
    #[serde(default)]
    pub include_history: bool,
}

impl QuoteOptions {
    /// 엔드포인트별 기본 range를 적용해 조회 파라미터로 변환합니다.
    pub fn into_params(self, default_range: &str) -> QuoteParams {
        QuoteParams::new(
            self.range.unwrap_or_else(|| default_range.to_string()),
            self.interval.unwrap_or_else(|| DEFAULT_INTERVAL.to_string()),
        )
        .with_history(self.include_history)
    }
}

/// 사용자 입력 심볼을 대문자로 바꾼 뒤 검증합니다.
pub fn parse_symbol(raw: &str) -> Result<String, QuoteApiError> {
    let symbol = normalize_symbol(raw);
    if validate_symbol(&symbol) {
        Ok(symbol)
    } else {
        Err(QuoteApiError::InvalidSymbol(raw.to_string()))
    }
}

/// 배치 심볼 목록을 검증합니다. 하나라도 잘못되면 전체가 거부됩니다.
pub fn parse_symbols(list: SymbolList) -> Result<Vec<String>, QuoteApiError> {
    let raw = list.into_vec();
    if raw.len() > MAX_BATCH_SYMBOLS {
        return Err(QuoteApiError::TooManySymbols(MAX_BATCH_SYMBOLS));
    }
    raw.iter().map(|s| parse_symbol(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_list_forms() {
        let joined: SymbolList = serde_json::from_str(r#""AAPL, msft""#).unwrap();
        assert_eq!(joined.into_vec(), vec!["AAPL", "msft"]);

        let list: SymbolList = serde_json::from_str(r#"["AAPL","BRK.B"]"#).unwrap();
        assert_eq!(list.into_vec(), vec!["AAPL", "BRK.B"]);
    }

    #[test]
    fn test_parse_symbols_uppercases() {
        let symbols = parse_symbols(SymbolList::Joined("aapl,btc-usd".into())).unwrap();
        assert_eq!(symbols, vec!["AAPL", "BTC-USD"]);
    }

    #[test]
    fn test_parse_symbols_rejects_any_invalid() {
        let err = parse_symbols(SymbolList::List(vec!["AAPL".into(), "???".into()])).unwrap_err();
        assert!(matches!(err, QuoteApiError::InvalidSymbol(s) if s == "???"));

        let err = parse_symbols(SymbolList::Joined("AAPL,".into())).unwrap_err();
        assert!(matches!(err, QuoteApiError::InvalidSymbol(_)));
    }

    #[test]
    fn test_parse_symbols_limit() {
        let many = (0..51).map(|i| format!("T{}", i)).collect();
        let err = parse_symbols(SymbolList::List(many)).unwrap_err();
        assert!(matches!(err, QuoteApiError::TooManySymbols(50)));

        let fifty = (0..50).map(|i| format!("T{}", i)).collect();
        assert_eq!(parse_symbols(SymbolList::List(fifty)).unwrap().len(), 50);
    }

    #[test]
    fn test_options_defaults() {
        let params = QuoteOptions::default().into_params("1mo");
        assert_eq!(params.range, "1mo");
        assert_eq!(params.interval, "1d");
        assert!(!params.include_history);
    }
}

//! 심볼 검증 및 자산 유형 정의.
//!
//! 이 모듈은 시세 심볼 관련 타입을 정의합니다:
//! - `AssetType` - 자산 유형 (주식, 암호화폐, 지수)
//! - `validate_symbol` - 모든 핸들러가 공유하는 심볼 형식 검증

use serde::{Deserialize, Serialize};
use std::fmt;

/// 심볼 최대 길이.
pub const MAX_SYMBOL_LEN: usize = 10;

/// 자산 유형 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// 주식/ETF
    Stock,
    /// 암호화폐 (예: BTC-USD)
    Crypto,
    /// 시장 지수 (예: ^GSPC)
    Index,
}

impl AssetType {
    /// 응답 페이로드에 기록되는 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Crypto => "crypto",
            AssetType::Index => "index",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 심볼 형식을 검증합니다.
///
/// 길이 1~10, 대문자 영문/숫자/`-`/`.`/`^` 로만 구성된 경우에만 `true`.
/// 요청 핸들러는 provider나 캐시에 접근하기 전에 반드시 이 검증을 통과시켜야 합니다.
///
/// ```
/// use market_core::validate_symbol;
///
/// assert!(validate_symbol("BRK.B"));
/// assert!(validate_symbol("^GSPC"));
/// assert!(!validate_symbol(""));
/// assert!(!validate_symbol("TOOLONGTICKER123"));
/// ```
pub fn validate_symbol(symbol: &str) -> bool {
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
        return false;
    }
    symbol
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '^'))
}

/// 사용자 입력 심볼을 정규화합니다 (공백 제거 + 대문자 변환).
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

//! 캐시 키 파생 및 2단계 TTL 정책.

use market_core::{
    CacheConfig, DEFAULT_HIGH_VOLUME_TICKERS, DEFAULT_LONG_TTL_SECS, DEFAULT_SHORT_TTL_SECS,
};
use std::collections::HashSet;
use std::time::Duration;

/// 캐시 키를 생성합니다.
///
/// 형식: `<namespace>:<SYMBOL_UPPERCASE>:<range>:<interval>`.
/// 순수 함수이며 심볼 대소문자를 구분하지 않습니다.
///
/// ```
/// use market_data::cache::cache_key;
///
/// assert_eq!(cache_key("yf", "aapl", "1d", "1d"), "yf:AAPL:1d:1d");
/// ```
pub fn cache_key(namespace: &str, symbol: &str, range: &str, interval: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        namespace,
        symbol.to_uppercase(),
        range,
        interval
    )
}

/// 한 심볼의 모든 range/interval 조합이 공유하는 키 접두사.
pub fn symbol_prefix(namespace: &str, symbol: &str) -> String {
    format!("{}:{}:", namespace, symbol.to_uppercase())
}

/// 2단계 TTL 정책.
///
/// 고트래픽 티커 목록에 포함된 심볼은 짧은 TTL, 나머지는 긴 TTL을 받습니다.
/// 목록은 생성 시 고정되며 이후 변경되지 않습니다.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    high_volume: HashSet<String>,
    short_ttl: Duration,
    long_ttl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_HIGH_VOLUME_TICKERS.iter().copied(),
            Duration::from_secs(DEFAULT_SHORT_TTL_SECS),
            Duration::from_secs(DEFAULT_LONG_TTL_SECS),
        )
    }
}

impl TtlPolicy {
    pub fn new<I, S>(high_volume: I, short_ttl: Duration, long_ttl: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            high_volume: high_volume
                .into_iter()
                .map(|s| s.as_ref().to_uppercase())
                .collect(),
            short_ttl,
            long_ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            &config.high_volume_tickers,
            Duration::from_secs(config.short_ttl_secs),
            Duration::from_secs(config.long_ttl_secs),
        )
    }

    pub fn is_high_volume(&self, symbol: &str) -> bool {
        self.high_volume.contains(&symbol.to_uppercase())
    }

    /// 심볼에 적용할 TTL.
    pub fn ttl_for(&self, symbol: &str) -> Duration {
        if self.is_high_volume(symbol) {
            self.short_ttl
        } else {
            self.long_ttl
        }
    }

    pub fn short_ttl(&self) -> Duration {
        self.short_ttl
    }

    pub fn long_ttl(&self) -> Duration {
        self.long_ttl
    }
}

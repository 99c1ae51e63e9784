//! 시세 데이터 조회 및 캐싱.
//!
//! 이 crate는 다음을 제공합니다:
//! - 원시 provider 데이터 정규화 (`normalizer`)
//! - 2단계 TTL 캐시 매니저와 만료 정리 태스크 (`cache`)
//! - PostgreSQL / 인메모리 캐시 테이블 (`storage`)
//! - Yahoo Finance provider (`provider`)
//! - read-through 시세 서비스 (`service`)

pub mod cache;
pub mod error;
pub mod normalizer;
pub mod provider;
pub mod service;
pub mod storage;

pub use error::{DataError, Result};

pub use cache::{cache_key, spawn_sweeper, symbol_prefix, CacheManager, TtlPolicy};
pub use normalizer::Normalizer;
pub use provider::{HistoryRequest, MarketDataProvider, RawPeriod, RawTicker, YahooProvider};
pub use service::{BatchResult, QuoteOutcome, QuoteParams, QuoteService};
pub use storage::{CacheRecord, CacheTable, Database, MemoryCacheTable, PgCacheTable};

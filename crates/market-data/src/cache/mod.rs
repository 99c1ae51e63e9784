//! 시세 캐싱 레이어.
//!
//! - 키 파생 및 2단계 TTL 정책 ([`policy`])
//! - read-through/write-through 캐시 매니저 ([`manager`])
//! - 만료 항목 정리 태스크 ([`sweeper`])

pub mod manager;
pub mod policy;
pub mod sweeper;

pub use manager::CacheManager;
pub use policy::{cache_key, symbol_prefix, TtlPolicy};
pub use sweeper::spawn_sweeper;

//! # Market Core
//!
//! 시세 조회 서비스의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 서비스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 정규화된 시세 스냅샷 (`NormalizedQuote`) 및 히스토리 레코드
//! - 심볼 검증 및 자산 유형 정의
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;

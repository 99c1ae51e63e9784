//! 시세 조회 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (주식/암호화폐/지수 시세, 캐시 관리)
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`error`]: API 에러 응답 타입
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{panic_response, ApiErrorResponse, ApiResult, QuoteApiError};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::*;
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::{create_test_state, create_test_state_with};

//! HTTP 요청 metrics middleware.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{record_http_duration, record_http_request, record_http_response};

/// 어떤 라우트에도 매칭되지 않은 요청의 `path` 라벨.
pub const UNMATCHED_PATH: &str = "unmatched";

/// HTTP 메트릭을 수집하는 미들웨어 레이어.
///
/// 각 요청에 대해 다음 메트릭을 기록합니다:
/// - `http_requests_total`: 총 요청 수 (method, path 라벨)
/// - `http_responses_total`: 총 응답 수 (method, path, status 라벨)
/// - `http_request_duration_seconds`: 요청 처리 시간 히스토그램
///
/// `path` 라벨은 라우트 템플릿(`/api/v1/cache/{symbol}`)이므로 카디널리티가
/// 등록된 라우트 수로 제한됩니다. `Router::layer`로 적용해야 합니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().to_string();
    let path = route_label(&request);

    record_http_request(&method, &path);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    record_http_response(&method, &path, status);
    record_http_duration(&method, &path, start.elapsed().as_secs_f64());

    response
}

/// 매칭된 라우트 템플릿. 매칭 실패 시 [`UNMATCHED_PATH`].
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string())
}

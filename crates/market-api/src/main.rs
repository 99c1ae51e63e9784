//! 시세 조회 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 주식/암호화폐/지수 시세 조회, 캐시 관리, 헬스 체크 엔드포인트를 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use market_api::error::panic_response;
use market_api::metrics::setup_metrics_recorder;
use market_api::middleware::metrics_layer;
use market_api::routes::create_api_router;
use market_api::state::AppState;
use market_core::{init_logging, AppConfig, DatabaseConfig, LogConfig};
use market_data::{
    CacheManager, CacheTable, Database, MemoryCacheTable, PgCacheTable, YahooProvider,
};

/// 캐시 테이블 생성.
///
/// 데이터베이스 URL이 없거나 연결에 실패하면 인메모리 테이블로 동작합니다.
async fn create_cache_table(config: &DatabaseConfig) -> (Arc<dyn CacheTable>, Option<Database>) {
    if config.url.is_none() {
        warn!("database.url not set, using in-memory cache table (entries are lost on restart)");
        return (Arc::new(MemoryCacheTable::new()), None);
    }

    let db = match Database::connect(config).await {
        Ok(db) => db,
        Err(e) => {
            warn!(error = %e, "Failed to connect to database, using in-memory cache table");
            return (Arc::new(MemoryCacheTable::new()), None);
        }
    };

    if config.run_migrations {
        if let Err(e) = db.migrate().await {
            warn!(error = %e, "Database migration failed");
        }
    }

    (Arc::new(PgCacheTable::new(db.pool().clone())), Some(db))
}

/// CORS 레이어 생성.
///
/// `CORS_ORIGINS` 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(create_api_router().with_state(state))
        // 핸들러 패닉 → 500 INTERNAL_ERROR
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let mut config = AppConfig::load_default().context("설정 로드 실패")?;
    if config.database.url.is_none() {
        config.database.url = std::env::var("DATABASE_URL").ok();
    }

    init_logging(LogConfig::from_settings(&config.logging))
        .map_err(|e| anyhow::anyhow!("logging init failed: {}", e))?;

    info!("Starting Market API server...");

    let metrics_handle = setup_metrics_recorder().context("Prometheus 레코더 설치 실패")?;
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                error = %e,
                "소켓 주소 설정이 유효하지 않습니다. MARKET__SERVER__HOST, MARKET__SERVER__PORT를 확인하세요."
            );
            e
        })?;

    let (table, db) = create_cache_table(&config.database).await;
    let cache = Arc::new(CacheManager::from_config(table, &config.cache));
    let provider = Arc::new(YahooProvider::new(&config.provider)?);

    let mut state = AppState::new(cache, provider);
    if let Some(db) = db {
        state = state.with_database(db);
    }
    let state = Arc::new(state);

    info!(
        version = %state.version,
        cache_backend = state.cache_backend(),
        namespace = state.cache.namespace(),
        provider = state.provider_name(),
        "Application state initialized"
    );

    // 전역 종료 토큰 (백그라운드 태스크 종료 전파용)
    let shutdown_token = CancellationToken::new();

    let sweeper = state.start_sweeper(config.cache.sweep_interval_secs, shutdown_token.clone());
    if sweeper.is_none() {
        info!("Cache sweeper disabled (cache.sweep_interval_secs = 0)");
    }

    let app = create_router(
        state,
        metrics_handle,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    info!(%addr, "API server listening");
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    if let Some(handle) = sweeper {
        if tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .is_err()
        {
            warn!("Cleanup timeout, forcing shutdown");
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}

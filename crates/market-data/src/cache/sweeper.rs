//! 만료 캐시 정리 백그라운드 태스크.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::CacheManager;

/// 주기적으로 [`CacheManager::sweep`]을 호출하는 태스크를 시작합니다.
///
/// 첫 정리는 `interval` 이후에 실행됩니다. `shutdown`이 취소되면 종료합니다.
pub fn spawn_sweeper(
    cache: Arc<CacheManager>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "캐시 정리 태스크 시작");

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("캐시 정리 태스크 종료");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = cache.sweep().await;
                    if removed > 0 {
                        info!(removed, "만료된 캐시 항목 정리");
                    } else {
                        debug!("정리할 만료 항목 없음");
                    }
                }
            }
        }
    })
}

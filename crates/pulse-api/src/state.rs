//! 애플리케이션 상태.

use chrono::{DateTime, Utc};

use pulse_data::CacheGateway;

/// 핸들러가 공유하는 상태.
#[derive(Clone)]
pub struct AppState {
    /// 캐시 저장소 게이트웨이
    pub gateway: CacheGateway,
    /// API 버전
    pub version: String,
    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(gateway: CacheGateway) -> Self {
        Self {
            gateway,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// 저장소가 응답하는지 확인.
    pub async fn is_store_healthy(&self) -> bool {
        self.gateway.ping().await.is_ok()
    }
}

/// 인메모리 저장소와 고정 시계로 만든 테스트 상태.
#[cfg(test)]
pub fn create_test_state(
    now: DateTime<Utc>,
) -> (
    std::sync::Arc<AppState>,
    std::sync::Arc<pulse_data::MemoryDocumentStore>,
) {
    use pulse_core::ManualClock;
    use pulse_data::MemoryDocumentStore;
    use std::sync::Arc;

    let store = Arc::new(MemoryDocumentStore::new());
    let gateway = CacheGateway::new(store.clone(), Arc::new(ManualClock::new(now)));
    (Arc::new(AppState::new(gateway)), store)
}

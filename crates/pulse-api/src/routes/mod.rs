//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 저장소 연결 확인 (readiness)
//! - `/cache/{kind}` - 캐시 문서 조회 (GET), upsert (PUT)

pub mod cache;
pub mod health;

pub use cache::{cache_router, CacheResponse, UpsertResponse};
pub use health::{health_router, ComponentStatus, HealthResponse};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .nest("/cache", cache_router())
}

//! 외부 데이터 수집과 캐시 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 타임아웃/재시도/프록시 순환/폴백 계층을 갖춘 외부 HTTP 클라이언트
//! - 제공자별 정규화 어댑터 (도미넌스·거래량, 공포탐욕 지수)
//! - 지표 종류별 문서 저장소 (PostgreSQL JSONB, 메모리)
//! - 히스토리 병합과 레거시 필드 정리를 수행하는 캐시 게이트웨이

pub mod cache;
pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, FetchError, FetchResult, Result};

pub use cache::{CacheGateway, UpsertSummary, LEGACY_TOP_LEVEL_KEYS};
pub use provider::{
    DominanceAdapter, Endpoint, FetchAttempt, FetchConfig, HttpTransport, ProxyCandidate,
    ProxyPool, RawResponse, ReqwestTransport, ResilientClient, SentimentAdapter, Tier,
    UpstreamRequest,
};
pub use storage::{
    DatabaseConfig, DocumentStore, MemoryDocumentStore, PgDocumentStore, SharedDocumentStore,
};

//! 캐시 문서 저장소.
//!
//! 지표 종류 하나당 JSON 객체 문서 하나를 보관합니다. 게이트웨이는 문서를
//! 원본 JSON 객체 그대로 읽고 쓰므로, 과거 스키마의 필드가 남아 있어도
//! 저장소 계층에서 잃어버리지 않습니다.

pub mod memory;
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::{DatabaseConfig, PgDocumentStore};

use async_trait::async_trait;
use pulse_core::MetricKind;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::Result;

/// 저장소에 보관되는 원본 문서.
pub type RawDocument = Map<String, Value>;

/// 지표 종류별 문서 저장소.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 문서 조회. 없으면 `None`.
    async fn get(&self, id: MetricKind) -> Result<Option<RawDocument>>;

    /// 문서 전체 교체 (없으면 생성).
    async fn put(&self, id: MetricKind, document: RawDocument) -> Result<()>;

    /// 저장소 연결 확인.
    async fn ping(&self) -> Result<()>;
}

pub type SharedDocumentStore = Arc<dyn DocumentStore>;

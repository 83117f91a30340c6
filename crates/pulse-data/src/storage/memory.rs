//! 프로세스 메모리 문서 저장소.
//!
//! 데이터베이스 없이 API 서버를 띄우거나 테스트할 때 사용합니다.

use async_trait::async_trait;
use pulse_core::MetricKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{DocumentStore, RawDocument};
use crate::error::{DataError, Result};

/// 메모리 문서 저장소.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<MetricKind, RawDocument>>,
    offline: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 장애 상태 전환. 오프라인이면 모든 호출이 [`DataError::StoreUnavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DataError::StoreUnavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, id: MetricKind) -> Result<Option<RawDocument>> {
        self.check_online()?;
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn put(&self, id: MetricKind, document: RawDocument) -> Result<()> {
        self.check_online()?;
        self.documents.write().await.insert(id, document);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_replaces_whole_document() {
        let store = MemoryDocumentStore::new();
        let first = json!({ "a": 1, "b": 2 }).as_object().cloned().unwrap();
        let second = json!({ "c": 3 }).as_object().cloned().unwrap();

        store.put(MetricKind::Dominance, first).await.unwrap();
        store.put(MetricKind::Dominance, second.clone()).await.unwrap();

        assert_eq!(store.get(MetricKind::Dominance).await.unwrap(), Some(second));
        assert_eq!(store.get(MetricKind::FearGreed).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_offline_store_is_unavailable() {
        let store = MemoryDocumentStore::new();
        store.set_offline(true);

        let err = store.get(MetricKind::Dominance).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.ping().await.is_err());

        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }
}

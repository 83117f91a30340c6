//! 캐시 기록 구독자.
//!
//! 구독 핸들러는 동기 함수이므로 스냅샷을 채널로 넘기고, 별도 태스크가
//! 게시 순서대로 게이트웨이에 저장합니다.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use pulse_data::CacheGateway;

use super::source::Snapshot;

/// 캐시 기록기 핸들.
#[derive(Clone)]
pub struct CacheWriter {
    tx: mpsc::UnboundedSender<Snapshot>,
}

impl CacheWriter {
    /// 기록 태스크 시작. 모든 핸들이 사라지면 남은 스냅샷을 저장하고 종료합니다.
    pub fn spawn(gateway: CacheGateway) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Snapshot>();

        let task = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                let kind = snapshot.kind();
                let result = match &snapshot {
                    Snapshot::Dominance(payload) => gateway.store_dominance(payload).await,
                    Snapshot::FearGreed(reading) => gateway.store_sentiment(reading).await,
                };

                match result {
                    Ok(summary) => debug!(
                        kind = %kind,
                        created = summary.created,
                        updated = summary.updated,
                        "Snapshot persisted"
                    ),
                    Err(e) => error!(kind = %kind, error = %e, "Failed to persist snapshot"),
                }
            }
            debug!("Cache writer stopped");
        });

        (Self { tx }, task)
    }

    /// 구독 핸들러로 쓸 클로저.
    pub fn handler(&self) -> impl Fn(&Snapshot) -> anyhow::Result<()> + Send + Sync + 'static {
        let tx = self.tx.clone();
        move |snapshot: &Snapshot| {
            tx.send(snapshot.clone())
                .map_err(|_| anyhow::anyhow!("cache writer is no longer running"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pulse_core::{ManualClock, MetricKind, SentimentReading};
    use pulse_data::MemoryDocumentStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_writer_persists_in_order() {
        let store = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 9, 12, 0, 0).unwrap(),
        ));
        let gateway = CacheGateway::new(store, clock);
        let (writer, task) = CacheWriter::spawn(gateway.clone());

        let handler = writer.handler();
        for value in [10u8, 20, 30] {
            handler(&Snapshot::FearGreed(SentimentReading {
                value,
                classification: SentimentReading::classify(value).to_string(),
                timestamp: 1704801600,
                time_until_update: None,
            }))
            .unwrap();
        }
        drop(handler);
        drop(writer);
        task.await.unwrap();

        let doc = gateway.get(MetricKind::FearGreed).await.unwrap();
        assert_eq!(doc.data["value"], serde_json::json!(30));
    }
}

//! 스트림별 스냅샷 소스.

use async_trait::async_trait;
use serde::Serialize;

use pulse_core::{DominancePayload, MetricKind, SentimentReading};
use pulse_data::{DominanceAdapter, FetchError, SentimentAdapter};

use super::movers::{top_movers, MoverFilter};

/// 스트림이 게시하는 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
    Dominance(DominancePayload),
    FearGreed(SentimentReading),
}

impl Snapshot {
    pub fn kind(&self) -> MetricKind {
        match self {
            Snapshot::Dominance(_) => MetricKind::Dominance,
            Snapshot::FearGreed(_) => MetricKind::FearGreed,
        }
    }
}

/// 스냅샷 수집 경계.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    fn kind(&self) -> MetricKind;

    /// 수집 후 파생 뷰까지 계산한 스냅샷.
    async fn fetch(&self) -> Result<Snapshot, FetchError>;
}

/// 도미넌스 소스: 어댑터 결과에 상승/하락 종목을 더합니다.
pub struct DominanceSource {
    adapter: DominanceAdapter,
    movers: MoverFilter,
}

impl DominanceSource {
    pub fn new(adapter: DominanceAdapter, movers: MoverFilter) -> Self {
        Self { adapter, movers }
    }
}

#[async_trait]
impl SnapshotSource for DominanceSource {
    fn kind(&self) -> MetricKind {
        MetricKind::Dominance
    }

    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let fetched = self.adapter.fetch().await?;
        let mut payload = fetched.payload;
        payload.top_movers = top_movers(&fetched.listing, &self.movers);
        Ok(Snapshot::Dominance(payload))
    }
}

/// 공포탐욕 지수 소스.
pub struct SentimentSource {
    adapter: SentimentAdapter,
}

impl SentimentSource {
    pub fn new(adapter: SentimentAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl SnapshotSource for SentimentSource {
    fn kind(&self) -> MetricKind {
        MetricKind::FearGreed
    }

    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        Ok(Snapshot::FearGreed(self.adapter.fetch().await?))
    }
}

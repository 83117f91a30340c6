//! 캐시 저장소 게이트웨이.
//!
//! 지표 종류별 문서를 읽고 씁니다.
//!
//! - 도미넌스: 기존 `data.historicalData`와 새 히스토리를 병합한 뒤
//!   레거시 최상위 필드를 제거하고 저장
//! - 공포탐욕 지수: 병합 없이 그대로 교체

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use pulse_core::{
    merge_history, CacheDocument, DominancePayload, MetricKind, RawHistoricalPoint,
    SentimentReading, SharedClock,
};

use super::migration::strip_legacy_keys;
use crate::error::{DataError, Result};
use crate::storage::{RawDocument, SharedDocumentStore};

/// upsert 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSummary {
    /// 새로 만든 문서 수 (0 또는 1)
    pub created: u32,
    /// 갱신한 문서 수 (0 또는 1)
    pub updated: u32,
    /// 저장 후 히스토리 포인트 수
    pub historical_points: usize,
}

impl UpsertSummary {
    fn new(existed: bool, historical_points: usize) -> Self {
        Self {
            created: u32::from(!existed),
            updated: u32::from(existed),
            historical_points,
        }
    }
}

/// 캐시 저장소 게이트웨이.
#[derive(Clone)]
pub struct CacheGateway {
    store: SharedDocumentStore,
    clock: SharedClock,
}

impl CacheGateway {
    pub fn new(store: SharedDocumentStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// 문서 조회. 없으면 [`DataError::NotFound`].
    pub async fn get(&self, kind: MetricKind) -> Result<CacheDocument> {
        let raw = self
            .store
            .get(kind)
            .await?
            .ok_or_else(|| DataError::NotFound(kind.to_string()))?;

        Ok(CacheDocument::from_stored(kind, &raw)?)
    }

    /// 종류별 upsert.
    pub async fn upsert(&self, kind: MetricKind, payload: Map<String, Value>) -> Result<UpsertSummary> {
        match kind {
            MetricKind::Dominance => self.upsert_dominance(payload).await,
            MetricKind::FearGreed => self.upsert_fear_greed(payload).await,
        }
    }

    /// 도미넌스 페이로드 병합 저장.
    ///
    /// 페이로드의 다른 필드는 그대로 `data`에 들어가고 `historicalData`만
    /// 기존 윈도우와 병합한 결과로 바뀝니다.
    pub async fn upsert_dominance(&self, payload: Map<String, Value>) -> Result<UpsertSummary> {
        let kind = MetricKind::Dominance;
        let now = self.clock.now();
        let existing = self.store.get(kind).await?;

        let existing_points = RawHistoricalPoint::list_from_value(
            existing
                .as_ref()
                .and_then(|doc| doc.get("data"))
                .and_then(|data| data.get("historicalData")),
        );
        let incoming_points = RawHistoricalPoint::list_from_value(payload.get("historicalData"));
        let merged = merge_history(&existing_points, &incoming_points, now);

        debug!(
            existing = existing_points.len(),
            incoming = incoming_points.len(),
            merged = merged.len(),
            "Historical window merged"
        );

        let mut data = payload;
        data.insert("historicalData".to_string(), serde_json::to_value(&merged)?);

        let existed = existing.is_some();
        let mut document = existing.unwrap_or_default();
        strip_legacy_keys(&mut document);
        stamp(&mut document, kind, Value::Object(data), now);

        self.store.put(kind, document).await?;

        let summary = UpsertSummary::new(existed, merged.len());
        info!(
            kind = %kind,
            created = summary.created,
            updated = summary.updated,
            historical_points = summary.historical_points,
            "Cache document upserted"
        );
        Ok(summary)
    }

    /// 공포탐욕 지수 저장 (교체).
    pub async fn upsert_fear_greed(&self, payload: Map<String, Value>) -> Result<UpsertSummary> {
        let kind = MetricKind::FearGreed;
        let now = self.clock.now();
        let existed = self.store.get(kind).await?.is_some();

        let mut document = RawDocument::new();
        stamp(&mut document, kind, Value::Object(payload), now);
        self.store.put(kind, document).await?;

        let summary = UpsertSummary::new(existed, 0);
        info!(kind = %kind, created = summary.created, updated = summary.updated, "Cache document replaced");
        Ok(summary)
    }

    /// 정규화된 도미넌스 페이로드 저장.
    pub async fn store_dominance(&self, payload: &DominancePayload) -> Result<UpsertSummary> {
        self.upsert_dominance(to_object(payload)?).await
    }

    /// 정규화된 공포탐욕 지수 저장.
    pub async fn store_sentiment(&self, reading: &SentimentReading) -> Result<UpsertSummary> {
        self.upsert_fear_greed(to_object(reading)?).await
    }

    /// 저장소 연결 확인.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

fn stamp(document: &mut RawDocument, kind: MetricKind, data: Value, now: DateTime<Utc>) {
    document.insert("id".to_string(), Value::String(kind.to_string()));
    document.insert("data".to_string(), data);
    document.insert("lastUpdate".to_string(), Value::from(now.timestamp_millis()));
    document.insert(
        "updatedAt".to_string(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(DataError::SerializationError(
            "payload did not serialize to an object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentStore, MemoryDocumentStore};
    use chrono::{Duration, TimeZone};
    use pulse_core::{Clock, ManualClock};
    use serde_json::json;
    use std::sync::Arc;

    fn setup(now: DateTime<Utc>) -> (CacheGateway, Arc<MemoryDocumentStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(ManualClock::new(now));
        let gateway = CacheGateway::new(store.clone(), clock.clone());
        (gateway, store, clock)
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_document_is_not_found() {
        let (gateway, _, _) = setup(midnight(2024, 1, 3));
        let err = gateway.get(MetricKind::Dominance).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dominance_upsert_merges_history_and_strips_legacy_keys() {
        let (gateway, store, _) = setup(midnight(2024, 1, 3));
        store
            .put(
                MetricKind::Dominance,
                object(json!({
                    "id": "dominance",
                    "owner": "ops",
                    "dominanceData": [{ "name": "BTC" }],
                    "top3Coins": [],
                    "data": { "historicalData": [
                        { "date": "2024-01-01", "btcDominance": 50 },
                        { "date": "2024-01-02", "btcDominance": 51 }
                    ]},
                    "lastUpdate": 0
                })),
            )
            .await
            .unwrap();

        let summary = gateway
            .upsert_dominance(object(json!({
                "dominanceData": [{ "name": "BTC", "value": 53 }],
                "historicalData": [
                    { "date": "2024-01-03", "btcDominance": 53 },
                    { "date": "2024-01-02", "btcDominance": 52 }
                ]
            })))
            .await
            .unwrap();

        assert_eq!(summary, UpsertSummary { created: 0, updated: 1, historical_points: 3 });

        let raw = store.get(MetricKind::Dominance).await.unwrap().unwrap();
        assert!(!raw.contains_key("dominanceData"));
        assert!(!raw.contains_key("top3Coins"));
        assert_eq!(raw["owner"], json!("ops"));
        assert_eq!(raw["data"]["dominanceData"], json!([{ "name": "BTC", "value": 53 }]));

        let dates: Vec<_> = raw["data"]["historicalData"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| (p["date"].clone(), p["btcDominance"].clone()))
            .collect();
        assert_eq!(
            dates,
            vec![
                (json!("2024-01-01"), json!(50.0)),
                (json!("2024-01-02"), json!(52.0)),
                (json!("2024-01-03"), json!(53.0)),
            ]
        );

        let doc = gateway.get(MetricKind::Dominance).await.unwrap();
        assert_eq!(doc.last_update, midnight(2024, 1, 3).timestamp_millis());
        assert_eq!(doc.updated_at, midnight(2024, 1, 3));
    }

    #[tokio::test]
    async fn test_dominance_upsert_applies_retention_relative_to_now() {
        let (gateway, _, clock) = setup(midnight(2024, 1, 3));
        gateway
            .upsert_dominance(object(json!({ "historicalData": [
                { "date": "2024-01-01", "btcDominance": 50 },
                { "date": "2024-01-02", "btcDominance": 51 }
            ]})))
            .await
            .unwrap();

        clock.set(midnight(2024, 1, 9));
        let summary = gateway
            .upsert_dominance(object(json!({ "historicalData": [
                { "date": "2024-01-02", "btcDominance": 52 },
                { "date": "2024-01-03", "btcDominance": 53 }
            ]})))
            .await
            .unwrap();

        assert_eq!(summary.historical_points, 1);
        let doc = gateway.get(MetricKind::Dominance).await.unwrap();
        assert_eq!(doc.data["historicalData"][0]["date"], json!("2024-01-03"));
    }

    #[tokio::test]
    async fn test_first_upsert_creates_document() {
        let (gateway, _, clock) = setup(midnight(2024, 1, 3));
        let mut payload = DominancePayload::default();
        payload.historical_data.push(pulse_core::HistoricalPoint::new(
            clock.now().date_naive() - Duration::days(1),
            52.0,
            17.0,
            31.0,
        ));

        let summary = gateway.store_dominance(&payload).await.unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.historical_points, 1);
    }

    #[tokio::test]
    async fn test_fear_greed_is_straight_replace() {
        let (gateway, store, _) = setup(midnight(2024, 1, 3));
        store
            .put(
                MetricKind::FearGreed,
                object(json!({ "data": { "value": 10, "history": [1, 2] }, "lastUpdate": 1, "legacy": true })),
            )
            .await
            .unwrap();

        let reading = SentimentReading {
            value: 64,
            classification: "Greed".to_string(),
            timestamp: 1704240000,
            time_until_update: None,
        };
        let summary = gateway.store_sentiment(&reading).await.unwrap();
        assert_eq!(summary.updated, 1);

        let raw = store.get(MetricKind::FearGreed).await.unwrap().unwrap();
        assert!(!raw.contains_key("legacy"));
        assert_eq!(
            raw["data"],
            json!({ "value": 64, "classification": "Greed", "timestamp": 1704240000 })
        );
    }

    #[tokio::test]
    async fn test_offline_store_surfaces_unavailable() {
        let (gateway, store, _) = setup(midnight(2024, 1, 3));
        store.set_offline(true);

        let err = gateway.upsert_dominance(Map::new()).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(gateway.ping().await.is_err());
    }
}

//! 지표 종류별 영속 캐시 문서.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::MetricKind;
use crate::error::{PulseError, PulseResult};

/// 지표 종류당 하나씩 upsert되는 캐시 문서.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDocument {
    /// 문서 키 (지표 종류)
    pub id: MetricKind,
    /// 정규화된 페이로드
    pub data: Value,
    /// 마지막 갱신 시각 (epoch ms)
    pub last_update: i64,
    /// 마지막 갱신 시각
    pub updated_at: DateTime<Utc>,
}

impl CacheDocument {
    /// 새 문서 생성.
    pub fn new(id: MetricKind, data: Value, now: DateTime<Utc>) -> Self {
        Self {
            id,
            data,
            last_update: now.timestamp_millis(),
            updated_at: now,
        }
    }

    /// 저장소의 원본 JSON 객체에서 문서를 읽습니다.
    ///
    /// 원본에는 과거 스키마의 최상위 필드가 남아 있을 수 있으므로
    /// 알려진 필드만 골라 읽습니다.
    pub fn from_stored(id: MetricKind, raw: &Map<String, Value>) -> PulseResult<Self> {
        let data = raw.get("data").cloned().unwrap_or(Value::Null);

        let last_update = raw
            .get("lastUpdate")
            .and_then(Value::as_i64)
            .ok_or_else(|| PulseError::InvalidDocument(format!("{}: lastUpdate 누락", id)))?;

        let updated_at = match raw.get("updatedAt").and_then(Value::as_str) {
            Some(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| PulseError::InvalidDocument(format!("{}: updatedAt {}", id, e)))?,
            None => DateTime::from_timestamp_millis(last_update).ok_or_else(|| {
                PulseError::InvalidDocument(format!("{}: lastUpdate 범위 초과", id))
            })?,
        };

        Ok(Self {
            id,
            data,
            last_update,
            updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_from_stored_ignores_legacy_fields() {
        let raw = json!({
            "id": "dominance",
            "data": { "dominanceData": [] },
            "lastUpdate": 1704067200000i64,
            "updatedAt": "2024-01-01T00:00:00Z",
            "volumeData": [1, 2, 3]
        });
        let doc = CacheDocument::from_stored(MetricKind::Dominance, raw.as_object().unwrap()).unwrap();

        assert_eq!(doc.last_update, 1704067200000);
        assert_eq!(doc.updated_at, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(doc.data, json!({ "dominanceData": [] }));
    }

    #[test]
    fn test_from_stored_requires_last_update() {
        let raw = json!({ "data": {} });
        assert!(CacheDocument::from_stored(MetricKind::FearGreed, raw.as_object().unwrap()).is_err());
    }
}

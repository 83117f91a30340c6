//! 일 단위 도미넌스 히스토리.
//!
//! 저장소나 외부 클라이언트에서 들어오는 히스토리는 형식이 제각각일 수 있으므로
//! [`RawHistoricalPoint`]로 관대하게 읽은 뒤 [`RawHistoricalPoint::normalize`]로
//! 날짜 키가 확정된 [`HistoricalPoint`]로 변환합니다.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 날짜 키가 확정된 히스토리 포인트 (날짜당 최대 1개).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPoint {
    /// 달력 날짜 (UTC), 윈도우 내 고유 키
    pub date: NaiveDate,
    /// BTC 도미넌스 (%)
    pub btc_dominance: f64,
    /// ETH 도미넌스 (%)
    pub eth_dominance: f64,
    /// 나머지 자산 도미넌스 (%)
    pub others_dominance: f64,
}

impl HistoricalPoint {
    /// 새 포인트 생성.
    pub fn new(date: NaiveDate, btc_dominance: f64, eth_dominance: f64, others_dominance: f64) -> Self {
        Self {
            date,
            btc_dominance,
            eth_dominance,
            others_dominance,
        }
    }
}

/// 검증 전 히스토리 포인트.
///
/// 날짜는 어떤 JSON 값이든 받아두고, 숫자 필드는 숫자 또는 숫자 문자열을 허용하며
/// 그 외에는 0으로 취급합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHistoricalPoint {
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub btc_dominance: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub eth_dominance: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub others_dominance: f64,
}

impl RawHistoricalPoint {
    /// 날짜를 해석할 수 있으면 [`HistoricalPoint`]로 변환.
    pub fn normalize(&self) -> Option<HistoricalPoint> {
        let date = self.date.as_ref().and_then(parse_point_date)?;
        Some(HistoricalPoint {
            date,
            btc_dominance: self.btc_dominance,
            eth_dominance: self.eth_dominance,
            others_dominance: self.others_dominance,
        })
    }

    /// JSON 배열 값에서 포인트 목록을 읽습니다.
    ///
    /// 배열이 아니면 빈 목록, 객체가 아닌 원소는 건너뜁니다.
    pub fn list_from_value(value: Option<&Value>) -> Vec<RawHistoricalPoint> {
        let Some(Value::Array(items)) = value else {
            return Vec::new();
        };

        items
            .iter()
            .filter(|item| item.is_object())
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect()
    }
}

impl From<&HistoricalPoint> for RawHistoricalPoint {
    fn from(point: &HistoricalPoint) -> Self {
        Self {
            date: Some(Value::String(point.date.format("%Y-%m-%d").to_string())),
            btc_dominance: point.btc_dominance,
            eth_dominance: point.eth_dominance,
            others_dominance: point.others_dominance,
        }
    }
}

/// 히스토리 날짜 해석.
///
/// 허용 형식: `YYYY-MM-DD`, RFC 3339 타임스탬프(UTC 날짜로 변환), epoch 밀리초.
pub fn parse_point_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.naive_utc().date())
            })
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

/// 숫자 또는 숫자 문자열을 f64로, 그 외(null, NaN 포함)는 0으로.
pub fn lenient_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(lenient_number).unwrap_or(0.0))
}

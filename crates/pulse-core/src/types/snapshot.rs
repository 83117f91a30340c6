//! 매 수집 사이클마다 다시 계산되는 시장 스냅샷.

use serde::{Deserialize, Serialize};

/// 도미넌스 차트의 한 항목 (0~100 퍼센트 값).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    /// 표시 이름 (예: "BTC", "Others")
    pub name: String,
    /// 점유율 (%)
    pub value: f64,
    /// 차트 색상 태그
    pub color_tag: String,
    /// 24시간 변화율 (%p)
    pub change_pct: f64,
}

impl MarketSnapshot {
    /// 새 스냅샷 생성. 값은 0~100 범위로 제한됩니다.
    pub fn new(
        name: impl Into<String>,
        value: f64,
        color_tag: impl Into<String>,
        change_pct: f64,
    ) -> Self {
        Self {
            name: name.into(),
            value: clamp_percent(value),
            color_tag: color_tag.into(),
            change_pct: if change_pct.is_finite() { change_pct } else { 0.0 },
        }
    }
}

/// 퍼센트 값을 0~100으로 제한 (NaN은 0).
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_value_is_clamped() {
        assert_eq!(MarketSnapshot::new("Others", -0.4, "#8c8c8c", 0.1).value, 0.0);
        assert_eq!(MarketSnapshot::new("BTC", 140.0, "#f7931a", 0.1).value, 100.0);
        assert_eq!(MarketSnapshot::new("ETH", f64::NAN, "#627eea", f64::NAN).change_pct, 0.0);
    }

    #[test]
    fn test_snapshot_json_is_camel_case() {
        let json = serde_json::to_value(MarketSnapshot::new("BTC", 52.1, "#f7931a", -0.3)).unwrap();
        assert_eq!(json["colorTag"], "#f7931a");
        assert_eq!(json["changePct"], -0.3);
    }
}

//! 지표 종류.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PulseError;

/// 캐시 문서 하나에 대응하는 지표 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// 도미넌스, 거래량, 시가총액 테이블
    #[serde(rename = "dominance")]
    Dominance,
    /// 공포탐욕 지수
    #[serde(rename = "fear-greed", alias = "fearGreed")]
    FearGreed,
}

impl MetricKind {
    /// 저장소 키 및 URL 경로에 쓰이는 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Dominance => "dominance",
            MetricKind::FearGreed => "fear-greed",
        }
    }

    /// 모든 지표 종류.
    pub fn all() -> [MetricKind; 2] {
        [MetricKind::Dominance, MetricKind::FearGreed]
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dominance" => Ok(MetricKind::Dominance),
            "fear-greed" | "fearGreed" | "fear_greed" => Ok(MetricKind::FearGreed),
            other => Err(PulseError::UnknownMetricKind(other.to_string())),
        }
    }
}

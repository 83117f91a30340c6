//! 제공자 어댑터가 만드는 정규화 페이로드.

use serde::{Deserialize, Serialize};

use super::{HistoricalPoint, MarketSnapshot};

/// 순위 리스팅의 한 자산 시세.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetQuote {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// 시가총액 순위 (1부터)
    pub rank: u32,
    /// 가격 (USD)
    pub price: f64,
    /// 시가총액 (USD)
    pub market_cap: f64,
    /// 24시간 거래량 (USD)
    pub volume_24h: f64,
    /// 24시간 가격 변화율 (%)
    pub percent_change_24h: f64,
    /// 24시간 거래량 변화율 (%), 제공자가 주지 않으면 0
    pub volume_change_24h: f64,
}

/// 전체 시장 지표.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMetrics {
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    pub btc_dominance: f64,
    pub eth_dominance: f64,
    /// BTC 도미넌스 24시간 변화 (%p)
    pub btc_dominance_change_24h: f64,
    /// ETH 도미넌스 24시간 변화 (%p)
    pub eth_dominance_change_24h: f64,
    /// 총 시가총액 24시간 변화율 (%)
    pub market_cap_change_24h: f64,
    /// 총 거래량 24시간 변화율 (%)
    pub volume_change_24h: f64,
}

/// 거래량 순위 항목 (스테이블코인 제외 상위 8개).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeEntry {
    pub rank: u32,
    pub symbol: String,
    pub name: String,
    pub volume_24h: f64,
    /// 전체 거래량 대비 점유율 (%)
    pub volume_dominance: f64,
    /// 24시간 거래량 변화율 (%), 제공자 값만 사용
    pub volume_change_24h: f64,
}

/// 시가총액 상위 10개 테이블 행.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub rank: u32,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub market_cap: f64,
    /// 시가총액 점유율 (%)
    pub dominance: f64,
    pub change_pct: f64,
}

/// 상승/하락 상위 종목 항목.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mover {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
}

/// 파생 뷰: 상승/하락 상위 종목.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMovers {
    pub gainers: Vec<Mover>,
    pub losers: Vec<Mover>,
}

/// 도미넌스 지표의 정규화 페이로드.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominancePayload {
    #[serde(default)]
    pub dominance_data: Vec<MarketSnapshot>,
    #[serde(default)]
    pub volume_data: Vec<VolumeEntry>,
    #[serde(default)]
    pub historical_data: Vec<HistoricalPoint>,
    #[serde(default)]
    pub dominance_table_data: Vec<TableRow>,
    #[serde(default)]
    pub top_movers: TopMovers,
    #[serde(default)]
    pub global: GlobalMetrics,
}

/// 도미넌스 어댑터의 수집 결과.
///
/// 상승/하락 종목 계산에는 리스팅 원본이 필요하므로 페이로드와 함께 넘깁니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DominanceFetch {
    pub payload: DominancePayload,
    pub listing: Vec<AssetQuote>,
}

/// 정규화된 공포탐욕 지수.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentReading {
    /// 지수 값 (0~100)
    pub value: u8,
    /// 분류 (예: "Fear", "Greed")
    pub classification: String,
    /// 측정 시각 (epoch 초)
    pub timestamp: i64,
    /// 다음 갱신까지 남은 시간 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_until_update: Option<i64>,
}

impl SentimentReading {
    /// 값 구간으로 분류 이름을 정합니다 (제공자가 분류를 주지 않을 때).
    pub fn classify(value: u8) -> &'static str {
        match value {
            0..=24 => "Extreme Fear",
            25..=44 => "Fear",
            45..=55 => "Neutral",
            56..=75 => "Greed",
            _ => "Extreme Greed",
        }
    }
}

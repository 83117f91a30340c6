//! Market Pulse 지표 수집기.
//!
//! API 서버와 독립적으로 실행되는 바이너리를 제공합니다:
//! - 도미넌스 지표 수집 (CoinMarketCap, CoinGecko 폴백)
//! - 공포탐욕 지수 수집 (CoinMarketCap, alternative.me 폴백)
//! - 벽시계 정렬 주기 갱신과 캐시 기록

pub mod config;
pub mod error;
pub mod scheduler;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use scheduler::{
    CacheWriter, CycleOutcome, RefreshScheduler, RefreshTrigger, Snapshot, SnapshotSource,
};
pub use stats::RefreshStats;

use std::sync::Arc;

use pulse_core::SharedClock;
use pulse_data::{DominanceAdapter, ResilientClient, SentimentAdapter};

use scheduler::{DominanceSource, SentimentSource};

/// 설정으로부터 두 스트림의 소스를 조립합니다.
///
/// 두 어댑터는 프록시 풀을 포함한 HTTP 클라이언트 하나를 공유합니다.
pub fn build_sources(
    config: &CollectorConfig,
    clock: SharedClock,
) -> Result<Vec<Arc<dyn SnapshotSource>>> {
    let client = Arc::new(ResilientClient::from_proxy_urls(
        config.fetch.client_config(),
        &config.fetch.proxy_urls,
    )?);

    let dominance = DominanceAdapter::new(
        client.clone(),
        config.providers.coinmarketcap(),
        config.providers.coingecko(),
        clock.clone(),
    )?;
    let sentiment = SentimentAdapter::new(
        client,
        config.providers.coinmarketcap(),
        config.providers.fear_greed_fallback(),
        clock,
    )?;

    let dominance: Arc<dyn SnapshotSource> =
        Arc::new(DominanceSource::new(dominance, config.movers.clone()));
    let sentiment: Arc<dyn SnapshotSource> = Arc::new(SentimentSource::new(sentiment));

    Ok(vec![dominance, sentiment])
}

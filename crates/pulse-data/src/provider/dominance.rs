//! 도미넌스·거래량·전체 지표 어댑터.
//!
//! 1차 제공자는 CoinMarketCap(전체 지표 + 순위 리스팅), 폴백은 CoinGecko
//! (`/global` + `/coins/markets`)입니다. 두 제공자의 응답은 같은
//! [`DominanceFetch`]로 정규화됩니다.
//!
//! # 파생 값
//!
//! - Others 도미넌스 = 100 - (BTC + ETH)
//! - 거래량 순위: 스테이블코인 제외 상위 8개
//! - 시가총액 테이블: 상위 10개
//! - 오늘 날짜의 히스토리 포인트 1개

use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use pulse_core::{
    AssetQuote, DominanceFetch, DominancePayload, GlobalMetrics, HistoricalPoint, MarketSnapshot,
    SharedClock, TableRow, VolumeEntry,
};

use super::fetch::{escalate, unavailable, ResilientClient};
use super::{number_at, parse_body, required_number, string_at, Endpoint};
use crate::error::{FetchError, FetchResult};

/// 거래량 순위 항목 수.
pub const VOLUME_RANK_SIZE: usize = 8;
/// 시가총액 테이블 행 수.
pub const TABLE_SIZE: usize = 10;
/// 리스팅 요청 개수.
const LISTING_LIMIT: u32 = 100;

/// 거래량 순위에서 제외하는 스테이블코인.
pub const STABLECOIN_DENYLIST: &[&str] = &[
    "USDT", "USDC", "DAI", "BUSD", "TUSD", "USDP", "FDUSD", "USDD", "PYUSD", "USDE", "GUSD",
    "FRAX", "LUSD", "USDS", "EURC",
];

/// 차트 색상.
pub const BTC_COLOR: &str = "#f7931a";
pub const ETH_COLOR: &str = "#627eea";
pub const OTHERS_COLOR: &str = "#8c8c8c";

pub fn is_stablecoin(symbol: &str) -> bool {
    STABLECOIN_DENYLIST
        .iter()
        .any(|s| s.eq_ignore_ascii_case(symbol))
}

/// 도미넌스 어댑터.
pub struct DominanceAdapter {
    client: Arc<ResilientClient>,
    primary: Endpoint,
    fallback: Option<Endpoint>,
    clock: SharedClock,
}

impl DominanceAdapter {
    /// 어댑터 생성. 자격 증명이 없으면 [`FetchError::Precondition`].
    pub fn new(
        client: Arc<ResilientClient>,
        primary: Endpoint,
        fallback: Option<Endpoint>,
        clock: SharedClock,
    ) -> FetchResult<Self> {
        primary.require_credential()?;
        if let Some(endpoint) = &fallback {
            endpoint.require_credential()?;
        }

        Ok(Self {
            client,
            primary,
            fallback,
            clock,
        })
    }

    /// 도미넌스 데이터 수집.
    pub async fn fetch(&self) -> FetchResult<DominanceFetch> {
        let primary = self.fetch_coinmarketcap().await;

        let (global, listing) = match &self.fallback {
            Some(endpoint) => {
                escalate("dominance", primary, || self.fetch_coingecko(endpoint)).await?
            }
            None => primary.map_err(|err| unavailable("dominance", err))?,
        };

        let today = self.clock.now().date_naive();
        let fetched = build_payload(global, listing, today);

        info!(
            btc = fetched.payload.global.btc_dominance,
            eth = fetched.payload.global.eth_dominance,
            assets = fetched.listing.len(),
            "Dominance fetched"
        );
        Ok(fetched)
    }

    async fn fetch_coinmarketcap(&self) -> FetchResult<(GlobalMetrics, Vec<AssetQuote>)> {
        let global = self
            .primary
            .request("global_metrics", "/v1/global-metrics/quotes/latest")
            .query("convert", "USD");
        let listing = self
            .primary
            .request("listings", "/v1/cryptocurrency/listings/latest")
            .query("start", "1")
            .query("limit", LISTING_LIMIT.to_string())
            .query("convert", "USD");

        tokio::try_join!(
            self.client.fetch_decoded(&global, decode_cmc_global),
            self.client.fetch_decoded(&listing, decode_cmc_listing),
        )
    }

    async fn fetch_coingecko(
        &self,
        endpoint: &Endpoint,
    ) -> FetchResult<(GlobalMetrics, Vec<AssetQuote>)> {
        let global = endpoint.request("global", "/global");
        let markets = endpoint
            .request("markets", "/coins/markets")
            .query("vs_currency", "usd")
            .query("order", "market_cap_desc")
            .query("per_page", LISTING_LIMIT.to_string())
            .query("page", "1");

        tokio::try_join!(
            self.client.fetch_decoded(&global, decode_coingecko_global),
            self.client.fetch_decoded(&markets, decode_coingecko_markets),
        )
    }
}

/// 전체 지표와 리스팅으로 정규화 페이로드 생성.
///
/// 상승/하락 종목은 필터 설정이 필요하므로 비워 둡니다.
pub fn build_payload(
    global: GlobalMetrics,
    mut listing: Vec<AssetQuote>,
    today: NaiveDate,
) -> DominanceFetch {
    let btc = global.btc_dominance;
    let eth = global.eth_dominance;
    let others = 100.0 - (btc + eth);

    let dominance_data = vec![
        MarketSnapshot::new("BTC", btc, BTC_COLOR, global.btc_dominance_change_24h),
        MarketSnapshot::new("ETH", eth, ETH_COLOR, global.eth_dominance_change_24h),
        MarketSnapshot::new(
            "Others",
            others,
            OTHERS_COLOR,
            -(global.btc_dominance_change_24h + global.eth_dominance_change_24h),
        ),
    ];

    listing.sort_by_key(|quote| if quote.rank == 0 { u32::MAX } else { quote.rank });

    let volume_data = volume_ranking(&listing, global.total_volume_24h);
    let dominance_table_data = listing
        .iter()
        .take(TABLE_SIZE)
        .map(|quote| TableRow {
            rank: quote.rank,
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            price: quote.price,
            market_cap: quote.market_cap,
            dominance: share(quote.market_cap, global.total_market_cap),
            change_pct: quote.percent_change_24h,
        })
        .collect();

    let historical_data = vec![HistoricalPoint::new(
        today,
        dominance_data[0].value,
        dominance_data[1].value,
        dominance_data[2].value,
    )];

    DominanceFetch {
        payload: DominancePayload {
            dominance_data,
            volume_data,
            historical_data,
            dominance_table_data,
            top_movers: Default::default(),
            global,
        },
        listing,
    }
}

fn volume_ranking(listing: &[AssetQuote], total_volume: f64) -> Vec<VolumeEntry> {
    let mut candidates: Vec<&AssetQuote> = listing
        .iter()
        .filter(|quote| !is_stablecoin(&quote.symbol))
        .collect();
    candidates.sort_by(|a, b| b.volume_24h.total_cmp(&a.volume_24h));

    candidates
        .into_iter()
        .take(VOLUME_RANK_SIZE)
        .enumerate()
        .map(|(idx, quote)| VolumeEntry {
            rank: idx as u32 + 1,
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            volume_24h: quote.volume_24h,
            volume_dominance: share(quote.volume_24h, total_volume),
            volume_change_24h: quote.volume_change_24h,
        })
        .collect()
}

fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        pulse_core::clamp_percent(part / total * 100.0)
    } else {
        0.0
    }
}

// ==================== CoinMarketCap ====================

fn decode_cmc_global(target: &str, body: &str) -> FetchResult<GlobalMetrics> {
    let root = parse_body(target, body)?;
    let data = root
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| FetchError::malformed(target, "missing data object"))?;

    Ok(GlobalMetrics {
        btc_dominance: required_number(target, data, &["btc_dominance"])?,
        eth_dominance: required_number(target, data, &["eth_dominance"])?,
        btc_dominance_change_24h: number_at(data, &["btc_dominance_24h_percentage_change"]),
        eth_dominance_change_24h: number_at(data, &["eth_dominance_24h_percentage_change"]),
        total_market_cap: number_at(data, &["quote", "USD", "total_market_cap"]),
        total_volume_24h: number_at(data, &["quote", "USD", "total_volume_24h"]),
        market_cap_change_24h: number_at(
            data,
            &["quote", "USD", "total_market_cap_yesterday_percentage_change"],
        ),
        volume_change_24h: number_at(
            data,
            &["quote", "USD", "total_volume_24h_yesterday_percentage_change"],
        ),
    })
}

fn decode_cmc_listing(target: &str, body: &str) -> FetchResult<Vec<AssetQuote>> {
    let root = parse_body(target, body)?;
    let items = root
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::malformed(target, "missing data array"))?;

    let quotes: Vec<AssetQuote> = items
        .iter()
        .filter_map(|item| {
            let symbol = string_at(item, &["symbol"])?;
            let at = |field: &str| number_at(item, &["quote", "USD", field]);
            Some(AssetQuote {
                id: string_at(item, &["id"]).unwrap_or_else(|| symbol.to_lowercase()),
                name: string_at(item, &["name"]).unwrap_or_else(|| symbol.clone()),
                rank: number_at(item, &["cmc_rank"]) as u32,
                price: at("price"),
                market_cap: at("market_cap"),
                volume_24h: at("volume_24h"),
                percent_change_24h: at("percent_change_24h"),
                volume_change_24h: at("volume_change_24h"),
                symbol,
            })
        })
        .collect();

    debug!(upstream = target, count = quotes.len(), "Listing decoded");
    Ok(quotes)
}

// ==================== CoinGecko ====================

fn decode_coingecko_global(target: &str, body: &str) -> FetchResult<GlobalMetrics> {
    let root = parse_body(target, body)?;
    let data = root
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| FetchError::malformed(target, "missing data object"))?;

    Ok(GlobalMetrics {
        btc_dominance: required_number(target, data, &["market_cap_percentage", "btc"])?,
        eth_dominance: required_number(target, data, &["market_cap_percentage", "eth"])?,
        btc_dominance_change_24h: 0.0,
        eth_dominance_change_24h: 0.0,
        total_market_cap: number_at(data, &["total_market_cap", "usd"]),
        total_volume_24h: number_at(data, &["total_volume", "usd"]),
        market_cap_change_24h: number_at(data, &["market_cap_change_percentage_24h_usd"]),
        volume_change_24h: 0.0,
    })
}

fn decode_coingecko_markets(target: &str, body: &str) -> FetchResult<Vec<AssetQuote>> {
    let root = parse_body(target, body)?;
    let items = root
        .as_array()
        .ok_or_else(|| FetchError::malformed(target, "expected an array"))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let symbol = string_at(item, &["symbol"])?.to_uppercase();
            Some(AssetQuote {
                id: string_at(item, &["id"]).unwrap_or_else(|| symbol.to_lowercase()),
                name: string_at(item, &["name"]).unwrap_or_else(|| symbol.clone()),
                rank: number_at(item, &["market_cap_rank"]) as u32,
                price: number_at(item, &["current_price"]),
                market_cap: number_at(item, &["market_cap"]),
                volume_24h: number_at(item, &["total_volume"]),
                percent_change_24h: number_at(item, &["price_change_percentage_24h"]),
                volume_change_24h: 0.0,
                symbol,
            })
        })
        .collect())
}

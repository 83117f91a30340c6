//! 상승/하락 상위 종목 계산.

use pulse_core::{AssetQuote, Mover, TopMovers};
use pulse_data::provider::dominance::is_stablecoin;

/// 상승/하락 종목 후보 필터.
#[derive(Debug, Clone, PartialEq)]
pub struct MoverFilter {
    /// 최소 24시간 거래량 (USD)
    pub min_volume_usd: f64,
    /// 최소 시가총액 (USD)
    pub min_market_cap_usd: f64,
    /// 최소 가격 (USD)
    pub min_price_usd: f64,
    /// 방향별 항목 수
    pub top_n: usize,
}

impl Default for MoverFilter {
    fn default() -> Self {
        Self {
            min_volume_usd: 1_000_000.0,
            min_market_cap_usd: 10_000_000.0,
            min_price_usd: 0.0001,
            top_n: 5,
        }
    }
}

impl MoverFilter {
    fn accepts(&self, quote: &AssetQuote) -> bool {
        !is_stablecoin(&quote.symbol)
            && quote.percent_change_24h.is_finite()
            && quote.volume_24h >= self.min_volume_usd
            && quote.market_cap >= self.min_market_cap_usd
            && quote.price >= self.min_price_usd
    }
}

/// 필터를 통과한 종목 중 24시간 변화율 기준 상승/하락 상위.
pub fn top_movers(listing: &[AssetQuote], filter: &MoverFilter) -> TopMovers {
    let mut candidates: Vec<&AssetQuote> = listing.iter().filter(|q| filter.accepts(q)).collect();
    candidates.sort_by(|a, b| b.percent_change_24h.total_cmp(&a.percent_change_24h));

    let gainers = candidates
        .iter()
        .filter(|q| q.percent_change_24h > 0.0)
        .take(filter.top_n)
        .map(|q| to_mover(q))
        .collect();
    let losers = candidates
        .iter()
        .rev()
        .filter(|q| q.percent_change_24h < 0.0)
        .take(filter.top_n)
        .map(|q| to_mover(q))
        .collect();

    TopMovers { gainers, losers }
}

fn to_mover(quote: &AssetQuote) -> Mover {
    Mover {
        symbol: quote.symbol.clone(),
        name: quote.name.clone(),
        price: quote.price,
        change_pct: quote.percent_change_24h,
        volume_24h: quote.volume_24h,
        market_cap: quote.market_cap,
    }
}

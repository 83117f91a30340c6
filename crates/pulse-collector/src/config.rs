//! 환경변수 기반 설정 모듈.

use std::time::Duration;

use pulse_data::{Endpoint, FetchConfig};

use crate::scheduler::{Alignment, MoverFilter};
use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// 외부 제공자 설정
    pub providers: ProviderConfig,
    /// 외부 요청 설정
    pub fetch: FetchSettings,
    /// 갱신 주기 설정
    pub schedule: ScheduleConfig,
    /// 상승/하락 종목 필터
    pub movers: MoverFilter,
}

/// 외부 제공자 설정
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// CoinMarketCap API 키 (필수)
    pub cmc_api_key: String,
    /// CoinGecko API 키 (있으면 도미넌스 폴백 활성화)
    pub coingecko_api_key: Option<String>,
    /// alternative.me API 키 (있으면 공포탐욕 폴백 활성화)
    pub fng_api_key: Option<String>,
    pub cmc_base_url: Option<String>,
    pub coingecko_base_url: Option<String>,
    pub fng_fallback_url: Option<String>,
}

/// 외부 요청 설정
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// 시도당 타임아웃 (밀리초)
    pub timeout_ms: u64,
    /// 재시도 기준 간격 (밀리초)
    pub retry_base_ms: u64,
    /// 프록시 URL 목록
    pub proxy_urls: Vec<String>,
}

/// 갱신 주기 설정
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// 갱신 주기 (분 단위)
    pub interval_minutes: u64,
    /// 다음 실행까지 최소 대기 (밀리초)
    pub min_delay_ms: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = required("DATABASE_URL")?;

        Ok(Self {
            database_url,
            providers: ProviderConfig::from_env()?,
            fetch: FetchSettings::from_env(),
            schedule: ScheduleConfig::from_env(),
            movers: MoverFilter {
                min_volume_usd: env_var_parse("MOVERS_MIN_VOLUME_USD", 1_000_000.0),
                min_market_cap_usd: env_var_parse("MOVERS_MIN_MARKET_CAP_USD", 10_000_000.0),
                min_price_usd: env_var_parse("MOVERS_MIN_PRICE_USD", 0.0001),
                top_n: env_var_parse("MOVERS_TOP_N", 5),
            },
        })
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cmc_api_key: required("CMC_API_KEY")?,
            coingecko_api_key: optional("COINGECKO_API_KEY"),
            fng_api_key: optional("FNG_API_KEY"),
            cmc_base_url: optional("CMC_BASE_URL"),
            coingecko_base_url: optional("COINGECKO_BASE_URL"),
            fng_fallback_url: optional("FNG_FALLBACK_URL"),
        })
    }

    /// 1차 제공자 엔드포인트
    pub fn coinmarketcap(&self) -> Endpoint {
        let endpoint = Endpoint::coinmarketcap(self.cmc_api_key.clone());
        match &self.cmc_base_url {
            Some(url) => endpoint.with_base_url(url.clone()),
            None => endpoint,
        }
    }

    /// 도미넌스 폴백 엔드포인트
    pub fn coingecko(&self) -> Option<Endpoint> {
        let key = self.coingecko_api_key.clone()?;
        let endpoint = Endpoint::coingecko(key);
        Some(match &self.coingecko_base_url {
            Some(url) => endpoint.with_base_url(url.clone()),
            None => endpoint,
        })
    }

    /// 공포탐욕 지수 폴백 엔드포인트
    pub fn fear_greed_fallback(&self) -> Option<Endpoint> {
        let key = self.fng_api_key.clone()?;
        let endpoint = Endpoint::alternative_me(key);
        Some(match &self.fng_fallback_url {
            Some(url) => endpoint.with_base_url(url.clone()),
            None => endpoint,
        })
    }
}

impl FetchSettings {
    pub fn from_env() -> Self {
        Self {
            timeout_ms: env_var_parse("FETCH_TIMEOUT_MS", 10_000),
            retry_base_ms: env_var_parse("FETCH_RETRY_BASE_MS", 500),
            proxy_urls: env_var_list("PROXY_URLS"),
        }
    }

    pub fn client_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            retry_base: Duration::from_millis(self.retry_base_ms),
        }
    }
}

impl ScheduleConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            interval_minutes: env_var_parse("REFRESH_INTERVAL_MINUTES", 5),
            min_delay_ms: env_var_parse("REFRESH_MIN_DELAY_MS", 1_000),
        }
    }

    /// 정렬 기준 생성 (주기 0분은 1분으로 취급)
    pub fn alignment(&self) -> Alignment {
        Alignment::new(
            Duration::from_secs(self.interval_minutes.max(1) * 60),
            Duration::from_millis(self.min_delay_ms),
        )
    }
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| {
        crate::error::CollectorError::Config(format!("{} 환경변수가 설정되지 않았습니다", key))
    })
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 쉼표로 구분된 목록 파싱
fn env_var_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|v| split_list(&v))
        .unwrap_or_default()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_ignores_blanks() {
        assert_eq!(
            split_list(" http://p1:8080, ,http://p2:8080,"),
            vec!["http://p1:8080", "http://p2:8080"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_fallback_endpoints_require_keys() {
        let providers = ProviderConfig {
            cmc_api_key: "cmc".into(),
            coingecko_api_key: None,
            fng_api_key: Some("fng".into()),
            cmc_base_url: Some("http://localhost:9000/".into()),
            coingecko_base_url: None,
            fng_fallback_url: None,
        };

        assert_eq!(providers.coinmarketcap().base_url, "http://localhost:9000");
        assert!(providers.coingecko().is_none());
        assert_eq!(
            providers.fear_greed_fallback().map(|e| e.base_url),
            Some("https://api.alternative.me".to_string())
        );
    }

    #[test]
    fn test_schedule_alignment_uses_minutes() {
        let schedule = ScheduleConfig {
            interval_minutes: 5,
            min_delay_ms: 1_000,
        };
        let alignment = schedule.alignment();
        assert_eq!(alignment.interval(), Duration::from_secs(300));
        assert_eq!(alignment.min_delay(), Duration::from_secs(1));
    }
}

//! 외부 데이터 제공자.
//!
//! - [`fetch`]: 타임아웃, 재시도, 프록시 순환, 폴백 계층을 갖춘 클라이언트
//! - [`dominance`]: 도미넌스·거래량·전체 지표 어댑터
//! - [`sentiment`]: 공포탐욕 지수 어댑터

pub mod dominance;
pub mod fetch;
pub mod proxy;
pub mod sentiment;
pub mod transport;

pub use dominance::DominanceAdapter;
pub use fetch::{escalate, Decoder, FetchAttempt, FetchConfig, ResilientClient, Tier};
pub use proxy::{ProxyCandidate, ProxyPool};
pub use sentiment::SentimentAdapter;
pub use transport::{HttpTransport, RawResponse, ReqwestTransport, UpstreamRequest};

use serde_json::Value;

use crate::error::{FetchError, FetchResult};

/// 자격 증명을 포함한 제공자 엔드포인트.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// 제공자 이름 (로그/오류용)
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    /// API 키를 실어 보낼 헤더 이름
    pub auth_header: String,
}

impl Endpoint {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        auth_header: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            auth_header: auth_header.into(),
        }
    }

    /// CoinMarketCap Pro API.
    pub fn coinmarketcap(api_key: impl Into<String>) -> Self {
        Self::new(
            "coinmarketcap",
            "https://pro-api.coinmarketcap.com",
            api_key,
            "X-CMC_PRO_API_KEY",
        )
    }

    /// CoinGecko Pro API.
    pub fn coingecko(api_key: impl Into<String>) -> Self {
        Self::new(
            "coingecko",
            "https://pro-api.coingecko.com/api/v3",
            api_key,
            "x-cg-pro-api-key",
        )
    }

    /// alternative.me 공포탐욕 지수 API.
    pub fn alternative_me(api_key: impl Into<String>) -> Self {
        Self::new("alternative.me", "https://api.alternative.me", api_key, "X-API-Key")
    }

    /// 기본 URL 교체 (테스트, 사설 미러).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 자격 증명 확인. 생성 시점에 호출합니다.
    pub fn require_credential(&self) -> FetchResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(FetchError::Precondition(format!(
                "{}: API key is not configured",
                self.provider
            )));
        }
        Ok(())
    }

    /// 자격 증명 헤더가 붙은 GET 요청.
    pub fn request(&self, target: &str, path: &str) -> UpstreamRequest {
        UpstreamRequest::get(
            format!("{}.{}", self.provider, target),
            format!("{}{}", self.base_url, path),
        )
        .header(self.auth_header.clone(), self.api_key.clone())
    }
}

/// JSON 본문 파싱. 실패하면 잘못된 본문 오류.
pub(crate) fn parse_body(target: &str, body: &str) -> FetchResult<Value> {
    serde_json::from_str(body).map_err(|e| FetchError::malformed(target, e.to_string()))
}

/// 경로를 따라 숫자를 읽습니다. 없거나 숫자가 아니면 0.
pub(crate) fn number_at(value: &Value, path: &[&str]) -> f64 {
    path.iter()
        .try_fold(value, |node, key| node.get(*key))
        .map(pulse_core::lenient_number)
        .unwrap_or(0.0)
}

/// 필수 숫자 필드. 없거나 NaN이면 잘못된 본문 오류.
pub(crate) fn required_number(target: &str, value: &Value, path: &[&str]) -> FetchResult<f64> {
    let node = path
        .iter()
        .try_fold(value, |node, key| node.get(*key))
        .ok_or_else(|| FetchError::malformed(target, format!("missing {}", path.join("."))))?;

    let parsed = match node {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| FetchError::malformed(target, format!("{} is not a number", path.join("."))))
}

/// 경로를 따라 문자열을 읽습니다.
pub(crate) fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(value, |node, key| node.get(*key))
        .and_then(|node| match node {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

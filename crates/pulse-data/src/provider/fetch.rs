//! 복원력 있는 외부 HTTP 클라이언트.
//!
//! # 동작
//!
//! ```text
//! fetch_tiered(primary, fallback)
//!   │
//!   ├─ primary 계층: 시도 1..N
//!   │     ├─ 프록시 선택 (라운드로빈, 블랙리스트 제외)
//!   │     ├─ 시도당 타임아웃
//!   │     ├─ 2xx 확인 + 본문 디코딩
//!   │     └─ 실패 시 attempt * base 만큼 대기 후 재시도
//!   │
//!   ├─ 5xx/타임아웃/잘못된 본문으로 소진 → fallback 계층 (같은 절차)
//!   │
//!   └─ 모두 실패 → FetchError::UpstreamUnavailable (마지막 원인 포함)
//! ```
//!
//! 시도 횟수는 프록시 풀이 있으면 `min(5, 풀 크기 + 1)`, 없으면 2입니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::proxy::ProxyPool;
use super::transport::{HttpTransport, RawResponse, ReqwestTransport, UpstreamRequest};
use crate::error::{FetchError, FetchResult};

/// 프록시 풀이 없을 때 시도 횟수.
const DIRECT_ATTEMPTS: u32 = 2;
/// 프록시 풀이 있을 때 최대 시도 횟수.
const MAX_PROXY_ATTEMPTS: u32 = 5;

/// 본문 디코더: (target, body) → 정규화 값.
pub type Decoder<T> = fn(&str, &str) -> FetchResult<T>;

/// 클라이언트 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// 시도당 타임아웃
    pub timeout: Duration,
    /// 선형 백오프 기준 간격
    pub retry_base: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            retry_base: Duration::from_millis(500),
        }
    }
}

/// 시도 한 번의 기록 (로그용).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub target: String,
    /// 1부터 시작
    pub attempt_index: u32,
    pub max_attempts: u32,
    pub proxy: Option<String>,
    pub last_error: Option<String>,
}

/// 폴백 계층 하나: 요청과 그 응답 형식의 디코더.
#[derive(Debug, Clone)]
pub struct Tier<T> {
    pub request: UpstreamRequest,
    pub decode: Decoder<T>,
}

impl<T> Tier<T> {
    pub fn new(request: UpstreamRequest, decode: Decoder<T>) -> Self {
        Self { request, decode }
    }
}

/// 타임아웃, 재시도, 프록시 순환을 적용하는 클라이언트.
pub struct ResilientClient {
    transport: Arc<dyn HttpTransport>,
    proxies: Option<Arc<ProxyPool>>,
    config: FetchConfig,
}

impl ResilientClient {
    /// 프록시 없이 생성.
    pub fn new(transport: Arc<dyn HttpTransport>, config: FetchConfig) -> Self {
        Self {
            transport,
            proxies: None,
            config,
        }
    }

    /// 프록시 풀 지정. 빈 풀은 무시합니다.
    pub fn with_proxy_pool(mut self, pool: Arc<ProxyPool>) -> Self {
        self.proxies = if pool.is_empty() { None } else { Some(pool) };
        self
    }

    /// reqwest 전송 계층과 프록시 URL 목록으로 생성.
    pub fn from_proxy_urls(config: FetchConfig, proxy_urls: &[String]) -> FetchResult<Self> {
        let transport = ReqwestTransport::with_proxies(proxy_urls.iter().cloned())?;
        let client = Self::new(Arc::new(transport), config);
        Ok(client.with_proxy_pool(Arc::new(ProxyPool::new(proxy_urls.iter().cloned()))))
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn proxy_pool(&self) -> Option<&Arc<ProxyPool>> {
        self.proxies.as_ref()
    }

    /// 계층 하나의 최대 시도 횟수.
    pub fn max_attempts(&self) -> u32 {
        match &self.proxies {
            Some(pool) => MAX_PROXY_ATTEMPTS.min(pool.len() as u32 + 1),
            None => DIRECT_ATTEMPTS,
        }
    }

    /// 기본 타임아웃으로 원본 응답 조회.
    pub async fn fetch(&self, request: &UpstreamRequest) -> FetchResult<RawResponse> {
        self.fetch_with_timeout(request, self.config.timeout).await
    }

    /// 지정 타임아웃으로 원본 응답 조회.
    pub async fn fetch_with_timeout(
        &self,
        request: &UpstreamRequest,
        timeout: Duration,
    ) -> FetchResult<RawResponse> {
        self.run(request, timeout, |_, raw: &RawResponse| Ok(raw.clone()))
            .await
    }

    /// 조회 후 디코딩. 디코딩 실패도 재시도 대상입니다.
    pub async fn fetch_decoded<T, F>(&self, request: &UpstreamRequest, decode: F) -> FetchResult<T>
    where
        F: Fn(&str, &str) -> FetchResult<T> + Send + Sync,
        T: Send,
    {
        self.run(request, self.config.timeout, |target, raw: &RawResponse| {
            decode(target, &raw.body)
        })
        .await
    }

    /// primary 계층이 실패하면 fallback 계층으로 넘어갑니다.
    pub async fn fetch_tiered<T: Send>(
        &self,
        primary: Tier<T>,
        fallback: Option<Tier<T>>,
    ) -> FetchResult<T> {
        let target = primary.request.target.clone();
        let primary_result = self.fetch_decoded(&primary.request, primary.decode).await;

        match fallback {
            Some(tier) => {
                escalate(&target, primary_result, || async move {
                    self.fetch_decoded(&tier.request, tier.decode).await
                })
                .await
            }
            None => primary_result.map_err(|err| unavailable(&target, err)),
        }
    }

    /// 시도 루프. 프록시는 이 호출이 아직 시도하지 않은 후보부터 고릅니다.
    async fn run<T, F>(&self, request: &UpstreamRequest, timeout: Duration, decode: F) -> FetchResult<T>
    where
        F: Fn(&str, &RawResponse) -> FetchResult<T> + Send + Sync,
        T: Send,
    {
        let max_attempts = self.max_attempts();
        let mut last_error: Option<FetchError> = None;
        let mut tried: Vec<String> = Vec::new();

        for attempt_index in 1..=max_attempts {
            let proxy = self
                .proxies
                .as_ref()
                .and_then(|pool| pool.select_untried(&tried));
            if let Some(url) = &proxy {
                if !tried.contains(url) {
                    tried.push(url.clone());
                }
            }
            let attempt = FetchAttempt {
                target: request.target.clone(),
                attempt_index,
                max_attempts,
                proxy: proxy.clone(),
                last_error: last_error.as_ref().map(|e| e.to_string()),
            };
            debug!(
                upstream = %attempt.target,
                attempt = attempt.attempt_index,
                max_attempts = attempt.max_attempts,
                proxy = ?attempt.proxy,
                last_error = ?attempt.last_error,
                "Upstream fetch attempt"
            );

            let outcome = match self.send_once(request, proxy.as_deref(), timeout).await {
                Ok(raw) => decode(&request.target, &raw),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(value) => {
                    if proxy.is_some() {
                        if let Some(pool) = &self.proxies {
                            pool.mark_succeeded();
                        }
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    warn!(
                        upstream = %request.target,
                        attempt = attempt_index,
                        error = %err,
                        "Upstream fetch failed (not retryable)"
                    );
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        upstream = %request.target,
                        attempt = attempt_index,
                        max_attempts = max_attempts,
                        proxy = ?proxy,
                        error = %err,
                        "Upstream fetch failed"
                    );
                    if let (Some(pool), Some(url)) = (&self.proxies, proxy.as_deref()) {
                        pool.mark_failed(url);
                    }
                    last_error = Some(err);

                    if attempt_index < max_attempts {
                        tokio::time::sleep(self.config.retry_base * attempt_index).await;
                    }
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            target: request.target.clone(),
            attempts: max_attempts,
            source: Box::new(
                last_error.unwrap_or_else(|| FetchError::Network("no attempt made".to_string())),
            ),
        })
    }

    async fn send_once(
        &self,
        request: &UpstreamRequest,
        proxy: Option<&str>,
        timeout: Duration,
    ) -> FetchResult<RawResponse> {
        let raw = match tokio::time::timeout(timeout, self.transport.send(request, proxy)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    target: request.target.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };

        if !raw.is_success() {
            return Err(FetchError::UpstreamStatus {
                target: request.target.clone(),
                status: raw.status,
            });
        }

        Ok(raw)
    }
}

/// primary 결과가 폴백 대상 오류면 fallback을 실행합니다.
///
/// 여러 요청으로 이루어진 계층(예: 도미넌스의 전체 지표 + 리스팅)에서도 쓸 수 있도록
/// 계층 실행은 클로저로 받습니다. 두 계층 모두 실패하면 fallback 쪽 원인을 담은
/// [`FetchError::UpstreamUnavailable`]을 돌려줍니다.
pub async fn escalate<T, F, Fut>(target: &str, primary: FetchResult<T>, fallback: F) -> FetchResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let primary_err = match primary {
        Ok(value) => return Ok(value),
        Err(err) if err.triggers_fallback() => err,
        Err(err) => return Err(unavailable(target, err)),
    };

    warn!(upstream = %target, error = %primary_err, "Primary tier failed, trying fallback");

    fallback().await.map_err(|fallback_err| FetchError::UpstreamUnavailable {
        target: target.to_string(),
        attempts: primary_err.attempts() + fallback_err.attempts(),
        source: Box::new(fallback_err),
    })
}

pub(crate) fn unavailable(target: &str, err: FetchError) -> FetchError {
    match err {
        FetchError::Precondition(_) | FetchError::UpstreamUnavailable { .. } => err,
        other => FetchError::UpstreamUnavailable {
            target: target.to_string(),
            attempts: other.attempts(),
            source: Box::new(other),
        },
    }
}

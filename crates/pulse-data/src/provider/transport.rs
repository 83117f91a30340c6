//! HTTP 전송 계층.
//!
//! [`HttpTransport`]는 요청 한 번을 보내는 경계입니다. 재시도, 타임아웃,
//! 프록시 선택은 [`ResilientClient`](super::ResilientClient)가 담당하고
//! 전송 계층은 선택된 프록시로 요청을 보내기만 합니다.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{FetchError, FetchResult};

/// 외부 GET 요청 정의.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// 로그와 오류에 쓰는 짧은 이름 (예: `cmc.global_metrics`)
    pub target: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn get(target: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// 상태 코드와 본문만 담은 응답.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 요청 한 번을 보내는 전송 계층.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// `proxy`가 주어지면 해당 프록시를 거쳐 요청합니다.
    async fn send(&self, request: &UpstreamRequest, proxy: Option<&str>)
        -> FetchResult<RawResponse>;
}

/// reqwest 기반 전송 계층.
///
/// reqwest 프록시는 클라이언트 단위로 설정되므로 프록시마다 클라이언트를 하나씩 만들어 둡니다.
pub struct ReqwestTransport {
    direct: reqwest::Client,
    proxied: HashMap<String, reqwest::Client>,
}

impl ReqwestTransport {
    /// 직접 연결 클라이언트만 생성.
    pub fn new() -> FetchResult<Self> {
        Self::with_proxies(std::iter::empty::<String>())
    }

    /// 프록시 URL마다 클라이언트를 미리 생성.
    pub fn with_proxies<I, S>(proxy_urls: I) -> FetchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let direct = Self::builder()
            .build()
            .map_err(|e| FetchError::Precondition(format!("HTTP client: {}", e)))?;

        let mut proxied = HashMap::new();
        for url in proxy_urls {
            let url = url.into();
            let proxy = reqwest::Proxy::all(&url)
                .map_err(|e| FetchError::Precondition(format!("invalid proxy {}: {}", url, e)))?;
            let client = Self::builder()
                .proxy(proxy)
                .build()
                .map_err(|e| FetchError::Precondition(format!("proxy client {}: {}", url, e)))?;
            proxied.insert(url, client);
        }

        Ok(Self { direct, proxied })
    }

    fn builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder().user_agent(concat!("market-pulse/", env!("CARGO_PKG_VERSION")))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &UpstreamRequest,
        proxy: Option<&str>,
    ) -> FetchResult<RawResponse> {
        let client = match proxy {
            Some(url) => self
                .proxied
                .get(url)
                .ok_or_else(|| FetchError::Precondition(format!("unknown proxy: {}", url)))?,
            None => &self.direct,
        };

        let mut builder = client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reqwest_transport_sends_headers_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/ping")
            .match_header("x-api-key", "secret")
            .match_query(mockito::Matcher::UrlEncoded("limit".into(), "1".into()))
            .with_status(200)
            .with_body("pong")
            .create_async()
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let request = UpstreamRequest::get("ping", format!("{}/v1/ping", server.url()))
            .header("x-api-key", "secret")
            .query("limit", "1");

        let response = transport.send(&request, None).await.unwrap();
        assert_eq!(response, RawResponse { status: 200, body: "pong".into() });
        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_proxy_url_is_precondition_error() {
        let result = ReqwestTransport::with_proxies(["not a url"]);
        assert!(matches!(result, Err(FetchError::Precondition(_))));
    }
}

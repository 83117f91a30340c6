//! 프록시 순환 풀.
//!
//! 실패한 프록시는 블랙리스트에 올리고 남은 후보만 라운드로빈으로 돌립니다.
//! 모든 후보가 블랙리스트에 오르면 목록을 비우고 처음부터 다시 시작하며,
//! 어느 프록시든 요청이 성공하면 블랙리스트 전체를 비웁니다.

use std::sync::Mutex;
use tracing::{debug, info};

/// 프록시 후보와 블랙리스트 상태.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCandidate {
    pub url: String,
    pub blacklisted: bool,
}

#[derive(Debug, Default)]
struct PoolState {
    candidates: Vec<ProxyCandidate>,
    cursor: usize,
}

/// 자가 복구 프록시 풀.
#[derive(Debug, Default)]
pub struct ProxyPool {
    state: Mutex<PoolState>,
}

impl ProxyPool {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let candidates = urls
            .into_iter()
            .map(|url| ProxyCandidate {
                url: url.into(),
                blacklisted: false,
            })
            .collect();

        Self {
            state: Mutex::new(PoolState {
                candidates,
                cursor: 0,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 다음 프록시 선택.
    ///
    /// 커서 위치부터 블랙리스트에 없는 첫 후보를 고릅니다. 남은 후보가 없으면
    /// 블랙리스트를 비우고 첫 후보를 돌려줍니다. 풀이 비어 있으면 `None`.
    pub fn select(&self) -> Option<String> {
        self.select_untried(&[])
    }

    /// 호출 하나가 아직 시도하지 않은 프록시를 우선 선택.
    ///
    /// 우선순위:
    ///
    /// ```text
    /// 1. 시도하지 않았고 블랙리스트에도 없는 후보
    /// 2. 시도하지 않은 후보 (다른 호출이 블랙리스트에 올린 것 포함)
    /// 3. 블랙리스트에 없는 후보
    /// ```
    ///
    /// 모든 후보가 블랙리스트에 있으면 먼저 블랙리스트를 비우고 커서를 처음으로 돌립니다.
    pub fn select_untried(&self, tried: &[String]) -> Option<String> {
        let mut state = self.lock();
        let len = state.candidates.len();
        if len == 0 {
            return None;
        }

        if state.candidates.iter().all(|c| c.blacklisted) {
            info!(candidates = len, "All proxies blacklisted, resetting pool");
            for candidate in state.candidates.iter_mut() {
                candidate.blacklisted = false;
            }
            state.cursor = 0;
        }

        let start = state.cursor % len;
        let candidates = &state.candidates;
        let order = || (0..len).map(move |offset| (start + offset) % len);
        let untried = |idx: usize| !tried.iter().any(|url| *url == candidates[idx].url);
        let healthy = |idx: usize| !candidates[idx].blacklisted;

        let idx = order()
            .find(|&idx| untried(idx) && healthy(idx))
            .or_else(|| order().find(|&idx| untried(idx)))
            .or_else(|| order().find(|&idx| healthy(idx)))
            .unwrap_or(start);
        let url = candidates[idx].url.clone();

        state.cursor = (idx + 1) % len;
        Some(url)
    }

    /// 실패한 프록시를 블랙리스트에 올림.
    pub fn mark_failed(&self, url: &str) {
        let mut state = self.lock();
        if let Some(candidate) = state.candidates.iter_mut().find(|c| c.url == url) {
            debug!(proxy = %url, "Proxy blacklisted");
            candidate.blacklisted = true;
        }
    }

    /// 성공 시 블랙리스트 전체 해제.
    pub fn mark_succeeded(&self) {
        let mut state = self.lock();
        for candidate in state.candidates.iter_mut() {
            candidate.blacklisted = false;
        }
    }

    /// 현재 후보 상태 복사본.
    pub fn snapshot(&self) -> Vec<ProxyCandidate> {
        self.lock().candidates.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

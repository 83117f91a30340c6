//! 구독자 허브.
//!
//! 스트림 하나의 구독자 목록과 마지막 스냅샷을 보관합니다.
//!
//! - 구독 즉시 마지막 스냅샷(오래된 것이라도)을 재전송
//! - 게시는 구독 순서대로 동기 전달
//! - 한 구독자의 오류나 패닉은 기록만 하고 나머지 전달을 계속
//! - 재전송과 게시 전달은 하나의 전달 잠금 아래에서 직렬화

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, warn};

/// 구독 핸들러.
pub type Handler<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// 구독 해제용 토큰.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

/// 게시 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// 정상 처리한 구독자 수
    pub delivered: usize,
    /// 오류/패닉을 낸 구독자 수
    pub failed: usize,
}

struct HubState<T> {
    next_token: u64,
    handlers: BTreeMap<SubscriptionToken, Handler<T>>,
    last: Option<T>,
}

/// 구독자 허브.
pub struct SubscriberHub<T> {
    name: &'static str,
    state: Mutex<HubState<T>>,
    /// 구독 재전송과 게시 전달 순서를 맞추는 잠금
    dispatch: Mutex<()>,
}

impl<T: Clone> SubscriberHub<T> {
    /// `name`은 로그에 쓰입니다.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(HubState {
                next_token: 1,
                handlers: BTreeMap::new(),
                last: None,
            }),
            dispatch: Mutex::new(()),
        }
    }

    /// 구독 등록. 마지막 스냅샷이 있으면 즉시 전달합니다.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler: Handler<T> = Arc::new(handler);
        let _dispatch = self.dispatch();
        let (token, replay) = {
            let mut state = self.lock();
            let token = SubscriptionToken(state.next_token);
            state.next_token += 1;
            state.handlers.insert(token, handler.clone());
            (token, state.last.clone())
        };

        if let Some(snapshot) = replay {
            self.deliver(token, &handler, &snapshot);
        }
        token
    }

    /// 구독 해제. 등록되어 있었으면 `true`.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.lock().handlers.remove(&token).is_some()
    }

    /// 스냅샷 저장 후 모든 구독자에게 전달.
    pub fn publish(&self, snapshot: T) -> PublishReport {
        let _dispatch = self.dispatch();
        let handlers: Vec<(SubscriptionToken, Handler<T>)> = {
            let mut state = self.lock();
            state.last = Some(snapshot.clone());
            state
                .handlers
                .iter()
                .map(|(token, handler)| (*token, handler.clone()))
                .collect()
        };

        let mut report = PublishReport::default();
        for (token, handler) in &handlers {
            if self.deliver(*token, handler, &snapshot) {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// 마지막 스냅샷.
    pub fn last(&self) -> Option<T> {
        self.lock().last.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }

    fn deliver(&self, token: SubscriptionToken, handler: &Handler<T>, snapshot: &T) -> bool {
        match catch_unwind(AssertUnwindSafe(|| handler(snapshot))) {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(hub = self.name, token = token.0, error = %e, "Subscriber returned an error");
                false
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(hub = self.name, token = token.0, panic = %message, "Subscriber panicked");
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dispatch(&self) -> MutexGuard<'_, ()> {
        self.dispatch.lock().unwrap_or_else(|e| e.into_inner())
    }
}

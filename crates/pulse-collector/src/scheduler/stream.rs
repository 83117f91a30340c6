//! 스트림 하나의 갱신 상태 기계.
//!
//! ```text
//! Idle ──refresh──▶ Fetching ──성공──▶ Published ──▶ Idle
//!                      │
//!                      └──실패──▶ FetchFailed ──▶ Idle (이전 스냅샷 유지)
//! ```
//!
//! Fetching 중에 들어온 갱신 요청은 아무 일도 하지 않습니다.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn, Instrument};

use pulse_core::MetricKind;

use super::hub::{PublishReport, SubscriberHub};
use super::source::{Snapshot, SnapshotSource};

/// 스트림 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Fetching,
}

/// 갱신 요청 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// 데몬 시작 직후
    Startup,
    /// 벽시계 정렬 주기
    Scheduled,
    /// 수동 요청
    Manual,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshTrigger::Startup => "startup",
            RefreshTrigger::Scheduled => "scheduled",
            RefreshTrigger::Manual => "manual",
        };
        write!(f, "{}", name)
    }
}

/// 갱신 사이클 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Published(PublishReport),
    FetchFailed(String),
    AlreadyRunning,
}

/// 스트림: 소스, 상태, 구독자 허브.
pub struct Stream {
    source: Arc<dyn SnapshotSource>,
    state: Mutex<StreamState>,
    hub: SubscriberHub<Snapshot>,
}

impl Stream {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        let hub_name = match source.kind() {
            MetricKind::Dominance => "dominance",
            MetricKind::FearGreed => "fear-greed",
        };
        Self {
            source,
            state: Mutex::new(StreamState::Idle),
            hub: SubscriberHub::new(hub_name),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.source.kind()
    }

    pub fn state(&self) -> StreamState {
        *lock(&self.state)
    }

    pub fn hub(&self) -> &SubscriberHub<Snapshot> {
        &self.hub
    }

    /// 갱신 사이클 한 번 실행.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> CycleOutcome {
        let kind = self.kind();
        let Some(guard) = FetchingGuard::acquire(&self.state) else {
            debug!(kind = %kind, trigger = %trigger, "Refresh already running, skipped");
            return CycleOutcome::AlreadyRunning;
        };

        let result = self
            .source
            .fetch()
            .instrument(pulse_core::refresh_span!("refresh", kind, trigger))
            .await;
        drop(guard);

        match result {
            Ok(snapshot) => {
                let report = self.hub.publish(snapshot);
                info!(
                    kind = %kind,
                    trigger = %trigger,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Snapshot published"
                );
                CycleOutcome::Published(report)
            }
            Err(e) => {
                warn!(kind = %kind, trigger = %trigger, error = %e, "Refresh failed, keeping previous snapshot");
                CycleOutcome::FetchFailed(e.to_string())
            }
        }
    }
}

/// Fetching 상태를 잡고, 해제(취소 포함) 시 Idle로 되돌립니다.
struct FetchingGuard<'a> {
    state: &'a Mutex<StreamState>,
}

impl<'a> FetchingGuard<'a> {
    fn acquire(state: &'a Mutex<StreamState>) -> Option<Self> {
        let mut current = lock(state);
        if *current == StreamState::Fetching {
            return None;
        }
        *current = StreamState::Fetching;
        Some(Self { state })
    }
}

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = StreamState::Idle;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

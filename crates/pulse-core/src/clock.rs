//! 시계 추상화.
//!
//! 스케줄러 정렬 계산과 히스토리 보존 기준은 모두 "현재 시각"에 의존하므로
//! 실제 벽시계 대신 주입 가능한 [`Clock`]을 통해 시간을 읽습니다.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// 현재 시각 제공자.
pub trait Clock: Send + Sync {
    /// 현재 UTC 시각.
    fn now(&self) -> DateTime<Utc>;
}

/// 공유 가능한 시계 타입.
pub type SharedClock = Arc<dyn Clock>;

/// 시스템 벽시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 조작하는 시계 (테스트 및 재현용).
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// 주어진 시각에 고정된 시계 생성.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// 현재 시각 변경.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// 현재 시각을 주어진 만큼 전진.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

//! 벽시계 정렬.
//!
//! 다음 실행 시각은 매번 현재 시각에서 새로 계산합니다. 이전 실행이 늦어져도
//! 오차가 누적되지 않습니다.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// 고정 주기의 벽시계 배수에 맞춘 실행 시각 계산기.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    interval: Duration,
    min_delay: Duration,
}

impl Alignment {
    /// `interval`이 0이면 1초로 취급합니다.
    pub fn new(interval: Duration, min_delay: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_secs(1)),
            min_delay,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// `now` 이후 첫 주기 배수 시각.
    ///
    /// 남은 시간이 최소 대기보다 짧으면 그다음 배수로 넘어갑니다.
    /// 예: 5분 주기에서 12:03:00 → 12:05:00, 12:04:59.5 → 12:10:00.
    pub fn next_fire_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let interval_ms = self.interval.as_millis() as i64;
        let now_ms = now.timestamp_millis();

        let mut next_ms = (now_ms.div_euclid(interval_ms) + 1) * interval_ms;
        if next_ms - now_ms < self.min_delay.as_millis() as i64 {
            next_ms += interval_ms;
        }

        DateTime::from_timestamp_millis(next_ms).unwrap_or(now)
    }

    /// `now`부터 다음 실행까지 대기 시간.
    pub fn delay_until_next(&self, now: DateTime<Utc>) -> Duration {
        (self.next_fire_at(now) - now).to_std().unwrap_or(self.interval)
    }
}

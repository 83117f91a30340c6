//! 갱신 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::scheduler::CycleOutcome;

/// 한 번의 갱신 사이클 통계 (여러 스트림 합산)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshStats {
    /// 갱신을 요청한 스트림 수
    pub total: usize,
    /// 게시에 성공한 스트림 수
    pub published: usize,
    /// 수집에 실패한 스트림 수
    pub failed: usize,
    /// 이미 수집 중이어서 건너뛴 스트림 수
    pub skipped: usize,
    /// 스냅샷을 받은 구독자 수
    pub delivered: usize,
    /// 오류를 낸 구독자 수
    pub subscriber_errors: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RefreshStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 스트림 하나의 결과 반영
    pub fn record(&mut self, outcome: &CycleOutcome) {
        self.total += 1;
        match outcome {
            CycleOutcome::Published(report) => {
                self.published += 1;
                self.delivered += report.delivered;
                self.subscriber_errors += report.failed;
            }
            CycleOutcome::FetchFailed(_) => self.failed += 1,
            CycleOutcome::AlreadyRunning => self.skipped += 1,
        }
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.published as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            published = self.published,
            failed = self.failed,
            skipped = self.skipped,
            delivered = self.delivered,
            subscriber_errors = self.subscriber_errors,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "갱신 완료"
        );
    }
}

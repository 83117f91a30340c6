//! 핵심 도메인 에러 타입.

use thiserror::Error;

/// 도메인 모델 수준의 에러.
#[derive(Debug, Error)]
pub enum PulseError {
    /// 알 수 없는 지표 종류
    #[error("알 수 없는 지표 종류: {0}")]
    UnknownMetricKind(String),

    /// 캐시 문서 구조가 잘못됨
    #[error("잘못된 캐시 문서: {0}")]
    InvalidDocument(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type PulseResult<T> = Result<T, PulseError>;

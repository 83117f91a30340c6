//! 에러 타입 정의.

use pulse_data::{DataError, FetchError};
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 외부 데이터 수집 에러
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// 캐시 저장소 에러
    #[error("Store error: {0}")]
    Store(#[from] DataError),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 외부 데이터 수집 오류.
#[derive(Debug, Error)]
pub enum FetchError {
    /// 호출 전 조건 미충족 (자격 증명 누락 등)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// 시도당 타임아웃 초과
    #[error("Request timeout after {timeout_ms}ms: {target}")]
    Timeout { target: String, timeout_ms: u64 },

    /// 네트워크/연결 오류
    #[error("Network error: {0}")]
    Network(String),

    /// 2xx가 아닌 응답
    #[error("Upstream {target} returned HTTP {status}")]
    UpstreamStatus { target: String, status: u16 },

    /// 구조적으로 잘못된 응답 본문
    #[error("Malformed payload from {target}: {reason}")]
    MalformedPayload { target: String, reason: String },

    /// 한 계층의 재시도 소진
    #[error("{target}: all {attempts} attempts failed: {source}")]
    RetriesExhausted {
        target: String,
        attempts: u32,
        source: Box<FetchError>,
    },

    /// 모든 계층 소진. 마지막 원인을 담습니다.
    #[error("Upstream unavailable: {target} after {attempts} attempts: {source}")]
    UpstreamUnavailable {
        target: String,
        attempts: u32,
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// 같은 계층 안에서 재시도할 만한 오류인지 확인.
    ///
    /// 타임아웃, 네트워크 오류, 5xx, 408/429, 잘못된 본문이 해당됩니다.
    /// 그 외 4xx는 요청 자체가 잘못된 것이므로 재시도하지 않습니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. }
            | FetchError::Network(_)
            | FetchError::MalformedPayload { .. } => true,
            FetchError::UpstreamStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }

    /// 다음 폴백 계층으로 넘어가야 하는 오류인지 확인.
    pub fn triggers_fallback(&self) -> bool {
        match self {
            FetchError::RetriesExhausted { .. } | FetchError::UpstreamUnavailable { .. } => true,
            other => other.is_retryable(),
        }
    }

    /// 잘못된 본문 오류 생성.
    pub fn malformed(target: &str, reason: impl Into<String>) -> Self {
        FetchError::MalformedPayload {
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    /// 이 오류에 이르기까지 보낸 요청 수.
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::RetriesExhausted { attempts, .. }
            | FetchError::UpstreamUnavailable { attempts, .. } => *attempts,
            FetchError::Precondition(_) => 0,
            _ => 1,
        }
    }

    /// 가장 안쪽 원인까지 따라갑니다.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::RetriesExhausted { source, .. }
            | FetchError::UpstreamUnavailable { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                target: err.url().map(|u| u.to_string()).unwrap_or_default(),
                timeout_ms: 0,
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// 캐시 저장소 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 저장소 연결 불가 (연결 실패, 풀 고갈)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 문서를 찾을 수 없음
    #[error("Document not found: {0}")]
    NotFound(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 마이그레이션 오류
    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl DataError {
    /// 저장소에 닿지 못한 오류인지 확인.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DataError::StoreUnavailable(_))
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DataError::StoreUnavailable(err.to_string())
            }
            sqlx::Error::Database(db_err) => DataError::QueryError(db_err.message().to_string()),
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DataError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DataError::MigrationError(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

impl From<pulse_core::PulseError> for DataError {
    fn from(err: pulse_core::PulseError) -> Self {
        DataError::InvalidData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

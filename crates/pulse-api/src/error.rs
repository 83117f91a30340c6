//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트가 같은 JSON 형식으로 에러를 돌려줍니다.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pulse_data::DataError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Document not found: dominance",
///   "timestamp": 1704758400
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "NOT_FOUND", "STORE_UNAVAILABLE", "INVALID_KIND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 상태 코드와 함께 에러 응답 생성.
pub fn api_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiErrorResponse>) {
    (status, Json(ApiErrorResponse::new(code, message)))
}

/// 캐시 저장소 에러를 HTTP 응답으로 변환.
///
/// | 에러 | 상태 |
/// |---|---|
/// | `NotFound` | 404 |
/// | `StoreUnavailable` | 503 |
/// | `InvalidData` (저장된 문서 손상) | 500 |
/// | 그 외 | 500 |
pub fn data_error(err: DataError) -> (StatusCode, Json<ApiErrorResponse>) {
    match &err {
        DataError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        DataError::StoreUnavailable(_) => {
            tracing::warn!(error = %err, "Cache store unavailable");
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "캐시 저장소에 연결할 수 없습니다",
            )
        }
        DataError::InvalidData(_) => {
            tracing::error!(error = %err, "Stored cache document is invalid");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INVALID_DOCUMENT",
                err.to_string(),
            )
        }
        _ => {
            tracing::error!(error = %err, "Cache store error");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR", err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_status_mapping() {
        let (status, body) = data_error(DataError::NotFound("dominance".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code(), "NOT_FOUND");

        let (status, body) = data_error(DataError::StoreUnavailable("pool closed".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.code(), "STORE_UNAVAILABLE");

        let (status, _) = data_error(DataError::QueryError("syntax".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_skips_empty_details() {
        let json = serde_json::to_value(ApiErrorResponse::new("INVALID_KIND", "bad")).unwrap();
        assert!(json.get("details").is_none());
        assert!(json.get("timestamp").is_some());
    }
}

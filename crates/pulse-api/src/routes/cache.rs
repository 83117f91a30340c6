//! 캐시 문서 endpoint.
//!
//! - `GET /cache/{kind}`: 지표 종류별 최신 문서
//! - `PUT /cache/dominance`: 히스토리 병합 후 upsert
//! - `PUT /cache/fear-greed`: 교체 upsert

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use pulse_core::MetricKind;
use pulse_data::UpsertSummary;

use crate::error::{api_error, data_error, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 캐시 조회 응답.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheResponse {
    pub success: bool,
    pub data: Value,
    /// 마지막 갱신 시각 (epoch ms)
    pub last_update: i64,
}

/// upsert 응답.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: UpsertSummary,
}

fn parse_kind(raw: &str) -> Result<MetricKind, (StatusCode, Json<ApiErrorResponse>)> {
    raw.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::with_details(
                "INVALID_KIND",
                format!("지원하지 않는 지표 종류입니다: {}", raw),
                serde_json::json!({ "supported": MetricKind::all().map(|k| k.as_str()) }),
            )),
        )
    })
}

/// GET /cache/{kind}
pub async fn get_cache(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<Json<CacheResponse>> {
    let kind = parse_kind(&kind)?;
    let document = state.gateway.get(kind).await.map_err(data_error)?;

    Ok(Json(CacheResponse {
        success: true,
        data: document.data,
        last_update: document.last_update,
    }))
}

/// PUT /cache/{kind}
///
/// 본문은 정규화된 페이로드 객체입니다.
pub async fn put_cache(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<UpsertResponse>> {
    let kind = parse_kind(&kind)?;
    let Value::Object(payload) = body else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_PAYLOAD",
            "페이로드는 JSON 객체여야 합니다",
        ));
    };

    let summary = state
        .gateway
        .upsert(kind, payload)
        .await
        .map_err(data_error)?;

    Ok(Json(UpsertResponse {
        success: true,
        summary,
    }))
}

/// 캐시 라우터 생성.
pub fn cache_router() -> Router<Arc<AppState>> {
    Router::new().route("/{kind}", get(get_cache).put(put_cache))
}

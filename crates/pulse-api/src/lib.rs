//! Market Pulse 캐시 REST API.
//!
//! 수집기가 저장한 지표 문서를 조회하고, 외부 수집기가 정규화된 페이로드를
//! 올릴 수 있는 엔드포인트를 제공합니다.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiErrorResponse, ApiResult};
pub use routes::create_api_router;
pub use state::AppState;

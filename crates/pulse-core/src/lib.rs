//! # Pulse Core
//!
//! 시장 지표 캐시 시스템의 핵심 도메인 모델과 순수 로직을 제공합니다.
//!
//! 이 크레이트는 다음을 포함합니다:
//! - 지표 종류, 스냅샷, 히스토리 포인트, 캐시 문서 타입
//! - 7일 롤링 윈도우를 유지하는 히스토리 병합 엔진 (순수 함수)
//! - 테스트 가능한 시계 추상화
//! - 로깅 인프라

pub mod clock;
pub mod error;
pub mod logging;
pub mod merge;
pub mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{PulseError, PulseResult};
pub use logging::*;
pub use merge::{merge_history, merge_points, is_retained, RETENTION_DAYS};
pub use types::*;

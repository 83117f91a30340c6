//! 캐시 게이트웨이와 문서 마이그레이션.

pub mod gateway;
pub mod migration;

pub use gateway::{CacheGateway, UpsertSummary};
pub use migration::{strip_legacy_keys, LEGACY_TOP_LEVEL_KEYS};

//! 시스템 전반에서 사용되는 공통 타입.

mod document;
mod history;
mod metric;
mod payload;
mod snapshot;

pub use document::*;
pub use history::*;
pub use metric::*;
pub use payload::*;
pub use snapshot::*;

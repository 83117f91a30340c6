//! 캐시 문서 스키마 마이그레이션.
//!
//! 과거 스키마는 페이로드 필드를 문서 최상위에 두었습니다. 현재 스키마는
//! 모두 `data` 아래에 두므로, 쓰기 직전에 최상위의 옛 필드를 제거합니다.

use tracing::debug;

use crate::storage::RawDocument;

/// 과거 스키마에서 문서 최상위에 있던 필드.
pub const LEGACY_TOP_LEVEL_KEYS: [&str; 6] = [
    "dominanceData",
    "volumeData",
    "historicalData",
    "dominanceTableData",
    "top3Coins",
    "global",
];

/// 최상위 레거시 필드 제거. 제거한 키 목록을 돌려줍니다.
///
/// `data` 아래의 같은 이름 필드는 건드리지 않습니다.
pub fn strip_legacy_keys(document: &mut RawDocument) -> Vec<&'static str> {
    let removed: Vec<&'static str> = LEGACY_TOP_LEVEL_KEYS
        .iter()
        .copied()
        .filter(|key| document.remove(*key).is_some())
        .collect();

    if !removed.is_empty() {
        debug!(keys = ?removed, "Stripped legacy top-level keys");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_only_top_level_legacy_keys() {
        let mut doc = json!({
            "id": "dominance",
            "dominanceData": [],
            "top3Coins": ["BTC"],
            "global": {},
            "owner": "ops",
            "data": { "dominanceData": [1], "global": { "x": 1 } }
        })
        .as_object()
        .cloned()
        .unwrap();

        let removed = strip_legacy_keys(&mut doc);

        assert_eq!(removed, vec!["dominanceData", "top3Coins", "global"]);
        assert!(doc.contains_key("owner"));
        assert_eq!(doc["data"], json!({ "dominanceData": [1], "global": { "x": 1 } }));
    }

    #[test]
    fn test_strip_clean_document_is_noop() {
        let mut doc = json!({ "data": {} }).as_object().cloned().unwrap();
        assert!(strip_legacy_keys(&mut doc).is_empty());
        assert_eq!(doc.len(), 1);
    }
}

//! 히스토리 병합 엔진.
//!
//! 날짜 키 기반 7일 롤링 윈도우를 유지하는 순수 함수입니다.
//! 저장소를 직접 읽거나 쓰지 않으므로 단독으로 테스트할 수 있습니다.
//!
//! # 알고리즘
//!
//! ```text
//! existing ──┐
//!            ├─ 날짜 해석 실패 포인트 제거
//! incoming ──┘
//!      │
//!      ▼
//! 1. existing을 날짜로 색인
//! 2. incoming 덮어쓰기 (같은 날짜면 incoming 우선)
//! 3. 날짜 오름차순 정렬
//! 4. now - 7일 이전 포인트 제거
//! ```
//!
//! 여러 인스턴스가 동시에 쓰더라도 날짜별 incoming 우선 규칙 덕분에
//! 윈도우는 중복 없이 수렴합니다 (마지막 병합 우선).

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;

use crate::types::{HistoricalPoint, RawHistoricalPoint};

/// 보존 기간 (일).
pub const RETENTION_DAYS: i64 = 7;

/// 원본 포인트 목록 병합.
///
/// 날짜가 없거나 해석할 수 없는 포인트는 색인 전에 버립니다.
/// `incoming`이 비어 있으면 `existing`에 보존 기간 필터만 적용한 결과가 됩니다.
pub fn merge_history(
    existing: &[RawHistoricalPoint],
    incoming: &[RawHistoricalPoint],
    now: DateTime<Utc>,
) -> Vec<HistoricalPoint> {
    merge_normalized(
        existing.iter().filter_map(RawHistoricalPoint::normalize),
        incoming.iter().filter_map(RawHistoricalPoint::normalize),
        now,
    )
}

/// 이미 날짜가 확정된 포인트 목록 병합.
pub fn merge_points(
    existing: &[HistoricalPoint],
    incoming: &[HistoricalPoint],
    now: DateTime<Utc>,
) -> Vec<HistoricalPoint> {
    merge_normalized(existing.iter().cloned(), incoming.iter().cloned(), now)
}

/// 포인트 날짜가 `now` 기준 보존 윈도우 안에 있는지 확인.
///
/// 날짜의 시작(00:00 UTC)이 `now - 7일`보다 뒤이고 `now`를 넘지 않아야 합니다.
pub fn is_retained(date: NaiveDate, now: DateTime<Utc>) -> bool {
    let day_start = date.and_time(NaiveTime::MIN).and_utc();
    let cutoff = now - Duration::days(RETENTION_DAYS);
    day_start > cutoff && day_start <= now
}

fn merge_normalized(
    existing: impl Iterator<Item = HistoricalPoint>,
    incoming: impl Iterator<Item = HistoricalPoint>,
    now: DateTime<Utc>,
) -> Vec<HistoricalPoint> {
    let mut by_date: BTreeMap<NaiveDate, HistoricalPoint> = BTreeMap::new();

    for point in existing {
        by_date.insert(point.date, point);
    }
    for point in incoming {
        by_date.insert(point.date, point);
    }

    by_date
        .into_values()
        .filter(|point| is_retained(point.date, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(date: NaiveDate, btc: f64) -> HistoricalPoint {
        HistoricalPoint::new(date, btc, 0.0, 100.0 - btc)
    }

    fn at_midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_merge_overlays_incoming_and_sorts() {
        let existing = vec![point(day(2024, 1, 1), 50.0), point(day(2024, 1, 2), 51.0)];
        let incoming = vec![point(day(2024, 1, 3), 53.0), point(day(2024, 1, 2), 52.0)];

        let merged = merge_points(&existing, &incoming, at_midnight(2024, 1, 3));

        assert_eq!(
            merged,
            vec![
                point(day(2024, 1, 1), 50.0),
                point(day(2024, 1, 2), 52.0),
                point(day(2024, 1, 3), 53.0),
            ]
        );
    }

    #[test]
    fn test_merge_retention_is_relative_to_now() {
        let existing = vec![point(day(2024, 1, 1), 50.0), point(day(2024, 1, 2), 51.0)];
        let incoming = vec![point(day(2024, 1, 2), 52.0), point(day(2024, 1, 3), 53.0)];

        let merged = merge_points(&existing, &incoming, at_midnight(2024, 1, 9));

        assert_eq!(merged, vec![point(day(2024, 1, 3), 53.0)]);
    }

    #[test]
    fn test_merge_with_empty_incoming_only_filters() {
        let existing = vec![
            point(day(2023, 12, 20), 49.0),
            point(day(2024, 1, 1), 50.0),
            point(day(2024, 1, 2), 51.0),
        ];

        let merged = merge_points(&existing, &[], at_midnight(2024, 1, 3));

        assert_eq!(merged, existing[1..].to_vec());
    }

    #[test]
    fn test_merge_drops_unparsable_dates() {
        let existing: Vec<RawHistoricalPoint> = serde_json::from_value(json!([
            { "date": "2024-01-01", "btcDominance": 50 },
            { "date": "not-a-date", "btcDominance": 99 },
            { "btcDominance": 98 }
        ]))
        .unwrap();
        let incoming: Vec<RawHistoricalPoint> = serde_json::from_value(json!([
            { "date": "2024-01-02T10:00:00Z", "btcDominance": "52" }
        ]))
        .unwrap();

        let merged = merge_history(&existing, &incoming, at_midnight(2024, 1, 3));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].btc_dominance, 50.0);
        assert_eq!(merged[1].date, day(2024, 1, 2));
        assert_eq!(merged[1].btc_dominance, 52.0);
    }

    #[test]
    fn test_merge_drops_future_points() {
        let incoming = vec![point(day(2024, 1, 5), 55.0)];
        let merged = merge_points(&[], &incoming, at_midnight(2024, 1, 3));
        assert!(merged.is_empty());
    }

    #[test]
    fn test_is_retained_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap();
        assert!(!is_retained(day(2024, 1, 2), now));
        assert!(is_retained(day(2024, 1, 3), now));
        assert!(is_retained(day(2024, 1, 9), now));
        assert!(!is_retained(day(2024, 1, 10), now));
    }

    fn arb_point() -> impl Strategy<Value = HistoricalPoint> {
        (0i64..40, 0.0f64..100.0).prop_map(|(offset, btc)| {
            point(day(2023, 12, 10) + Duration::days(offset), btc)
        })
    }

    fn arb_now() -> impl Strategy<Value = DateTime<Utc>> {
        (0i64..45, 0u32..24).prop_map(|(offset, hour)| {
            at_midnight(2023, 12, 10) + Duration::days(offset) + Duration::hours(hour as i64)
        })
    }

    proptest! {
        #[test]
        fn prop_merge_keys_unique_sorted_and_in_window(
            existing in proptest::collection::vec(arb_point(), 0..20),
            incoming in proptest::collection::vec(arb_point(), 0..20),
            now in arb_now(),
        ) {
            let merged = merge_points(&existing, &incoming, now);

            for pair in merged.windows(2) {
                prop_assert!(pair[0].date < pair[1].date);
            }
            for p in &merged {
                let start = p.date.and_time(NaiveTime::MIN).and_utc();
                prop_assert!(start >= now - Duration::days(RETENTION_DAYS));
                prop_assert!(start <= now);
            }
        }

        #[test]
        fn prop_merge_is_idempotent(
            existing in proptest::collection::vec(arb_point(), 0..20),
            incoming in proptest::collection::vec(arb_point(), 0..20),
            now in arb_now(),
        ) {
            let once = merge_points(&existing, &incoming, now);
            let twice = merge_points(&once, &[], now);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_incoming_wins_on_conflict(
            offset in 0i64..7,
            v1 in 0.0f64..100.0,
            v2 in 0.0f64..100.0,
        ) {
            prop_assume!(v1 != v2);
            let now = at_midnight(2024, 1, 10);
            let date = day(2024, 1, 10) - Duration::days(offset);

            let merged = merge_points(&[point(date, v1)], &[point(date, v2)], now);

            prop_assert_eq!(merged.len(), 1);
            prop_assert_eq!(merged[0].btc_dominance, v2);
        }
    }
}

//! 갱신 스케줄러와 구독자 허브.
//!
//! # 구조
//!
//! ```text
//! RefreshScheduler
//!   ├─ Alignment        다음 실행 시각 (벽시계 배수)
//!   ├─ Clock            현재 시각 (테스트에서 교체)
//!   └─ Stream × N       지표 종류별
//!        ├─ SnapshotSource   수집 + 파생 뷰
//!        ├─ StreamState      Idle / Fetching
//!        └─ SubscriberHub    구독자, 마지막 스냅샷
//! ```
//!
//! 조립 지점에서 소스와 시계를 주입해 생성합니다.

pub mod alignment;
pub mod hub;
pub mod movers;
pub mod source;
pub mod stream;
pub mod writer;

pub use alignment::Alignment;
pub use hub::{Handler, PublishReport, SubscriberHub, SubscriptionToken};
pub use movers::{top_movers, MoverFilter};
pub use source::{DominanceSource, SentimentSource, Snapshot, SnapshotSource};
pub use stream::{CycleOutcome, RefreshTrigger, Stream, StreamState};
pub use writer::CacheWriter;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use pulse_core::{MetricKind, SharedClock};

use crate::stats::RefreshStats;

/// 벽시계 정렬 갱신 스케줄러.
pub struct RefreshScheduler {
    streams: Vec<Arc<Stream>>,
    alignment: Alignment,
    clock: SharedClock,
}

impl RefreshScheduler {
    pub fn new(
        sources: Vec<Arc<dyn SnapshotSource>>,
        alignment: Alignment,
        clock: SharedClock,
    ) -> Self {
        Self {
            streams: sources.into_iter().map(|s| Arc::new(Stream::new(s))).collect(),
            alignment,
            clock,
        }
    }

    pub fn kinds(&self) -> Vec<MetricKind> {
        self.streams.iter().map(|s| s.kind()).collect()
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    fn stream(&self, kind: MetricKind) -> Option<&Arc<Stream>> {
        self.streams.iter().find(|s| s.kind() == kind)
    }

    /// 구독 등록. 해당 종류의 스트림이 없으면 `None`.
    pub fn subscribe<F>(&self, kind: MetricKind, handler: F) -> Option<SubscriptionToken>
    where
        F: Fn(&Snapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.stream(kind).map(|s| s.hub().subscribe(handler))
    }

    pub fn unsubscribe(&self, kind: MetricKind, token: SubscriptionToken) -> bool {
        self.stream(kind)
            .map(|s| s.hub().unsubscribe(token))
            .unwrap_or(false)
    }

    /// 스냅샷을 해당 스트림 구독자에게 직접 게시.
    pub fn publish(&self, snapshot: Snapshot) -> Option<PublishReport> {
        self.stream(snapshot.kind()).map(|s| s.hub().publish(snapshot))
    }

    pub fn last_snapshot(&self, kind: MetricKind) -> Option<Snapshot> {
        self.stream(kind).and_then(|s| s.hub().last())
    }

    pub fn state(&self, kind: MetricKind) -> Option<StreamState> {
        self.stream(kind).map(|s| s.state())
    }

    /// 스트림 하나를 즉시 갱신. 정렬된 일정에는 영향이 없습니다.
    pub async fn refresh(&self, kind: MetricKind, trigger: RefreshTrigger) -> Option<CycleOutcome> {
        let stream = self.stream(kind)?;
        Some(stream.refresh(trigger).await)
    }

    /// 모든 스트림을 동시에 갱신.
    pub async fn refresh_all(&self, trigger: RefreshTrigger) -> RefreshStats {
        let started = tokio::time::Instant::now();

        let outcomes =
            futures::future::join_all(self.streams.iter().map(|s| s.refresh(trigger))).await;

        let mut stats = RefreshStats::new();
        for outcome in &outcomes {
            stats.record(outcome);
        }
        stats.elapsed = started.elapsed();
        stats
    }

    /// 현재 시각 기준 다음 실행 시각.
    pub fn next_fire_at(&self) -> DateTime<Utc> {
        self.alignment.next_fire_at(self.clock.now())
    }

    /// 시작 갱신 후 취소될 때까지 정렬된 주기로 갱신.
    ///
    /// 취소는 대기 중에만 확인하므로 진행 중인 사이클은 끝까지 실행됩니다.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            streams = self.streams.len(),
            interval_secs = self.alignment.interval().as_secs(),
            "Refresh scheduler started"
        );

        self.refresh_all(RefreshTrigger::Startup)
            .await
            .log_summary("시작 갱신");

        loop {
            let now = self.clock.now();
            let next = self.alignment.next_fire_at(now);
            let delay = self.alignment.delay_until_next(now);
            info!(next_fire_at = %next, delay_secs = delay.as_secs(), "Next refresh scheduled");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, scheduler stopping");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    self.refresh_all(RefreshTrigger::Scheduled)
                        .await
                        .log_summary("정기 갱신");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pulse_core::{Clock, ManualClock, SentimentReading};
    use pulse_data::{
        CacheGateway, DominanceAdapter, Endpoint, FetchConfig, FetchError, MemoryDocumentStore,
        ReqwestTransport, ResilientClient,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// 호출마다 값이 1씩 오르는 소스. `fail`이면 실패, `gate`가 있으면 신호까지 대기.
    struct CountingSource {
        calls: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
        gate: Option<Arc<Notify>>,
    }

    impl CountingSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: Default::default(),
                gate: None,
            })
        }

        fn gated(gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: Default::default(),
                gate: Some(gate),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        fn kind(&self) -> MetricKind {
            MetricKind::FearGreed
        }

        async fn fetch(&self) -> Result<Snapshot, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Network("upstream down".into()));
            }
            Ok(Snapshot::FearGreed(SentimentReading {
                value: n as u8,
                classification: SentimentReading::classify(n as u8).to_string(),
                timestamp: 0,
                time_until_update: None,
            }))
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 9, 12, 3, 0).unwrap(),
        ))
    }

    fn scheduler(source: Arc<CountingSource>, clock: Arc<ManualClock>) -> RefreshScheduler {
        let source: Arc<dyn SnapshotSource> = source;
        RefreshScheduler::new(
            vec![source],
            Alignment::new(Duration::from_secs(300), Duration::from_secs(1)),
            clock,
        )
    }

    fn value_of(snapshot: &Snapshot) -> u8 {
        match snapshot {
            Snapshot::FearGreed(r) => r.value,
            Snapshot::Dominance(_) => panic!("unexpected dominance snapshot"),
        }
    }

    #[tokio::test]
    async fn test_next_fire_at_uses_injected_clock() {
        let clock = clock();
        let scheduler = scheduler(CountingSource::new(), clock.clone());

        assert_eq!(
            scheduler.next_fire_at(),
            Utc.with_ymd_and_hms(2024, 1, 9, 12, 5, 0).unwrap()
        );
        clock.set(Utc.with_ymd_and_hms(2024, 1, 9, 12, 7, 30).unwrap());
        assert_eq!(
            scheduler.next_fire_at(),
            Utc.with_ymd_and_hms(2024, 1, 9, 12, 10, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_refresh_publishes_to_subscribers() {
        let scheduler = scheduler(CountingSource::new(), clock());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        scheduler
            .subscribe(MetricKind::FearGreed, move |s| {
                sink.lock().unwrap().push(value_of(s));
                Ok(())
            })
            .unwrap();

        let outcome = scheduler
            .refresh(MetricKind::FearGreed, RefreshTrigger::Manual)
            .await
            .unwrap();

        assert_eq!(outcome, CycleOutcome::Published(PublishReport { delivered: 1, failed: 0 }));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(scheduler.state(MetricKind::FearGreed), Some(StreamState::Idle));
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_replay() {
        let scheduler = scheduler(CountingSource::new(), clock());
        scheduler.refresh_all(RefreshTrigger::Manual).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        scheduler.subscribe(MetricKind::FearGreed, move |s| {
            sink.lock().unwrap().push(value_of(s));
            Ok(())
        });

        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_snapshot() {
        let source = CountingSource::new();
        let scheduler = scheduler(source.clone(), clock());
        scheduler.refresh_all(RefreshTrigger::Manual).await;

        source.fail.store(true, Ordering::SeqCst);
        let stats = scheduler.refresh_all(RefreshTrigger::Manual).await;

        assert_eq!(stats.failed, 1);
        assert_eq!(
            scheduler.last_snapshot(MetricKind::FearGreed).map(|s| value_of(&s)),
            Some(1)
        );
        assert_eq!(scheduler.state(MetricKind::FearGreed), Some(StreamState::Idle));
    }

    #[tokio::test]
    async fn test_refresh_while_fetching_is_noop() {
        let gate = Arc::new(Notify::new());
        let source = CountingSource::gated(gate.clone());
        let scheduler = Arc::new(scheduler(source.clone(), clock()));

        let first = tokio::spawn({
            let scheduler = scheduler.clone();
            async move {
                scheduler
                    .refresh(MetricKind::FearGreed, RefreshTrigger::Scheduled)
                    .await
            }
        });

        while scheduler.state(MetricKind::FearGreed) != Some(StreamState::Fetching) {
            tokio::task::yield_now().await;
        }

        let second = scheduler
            .refresh(MetricKind::FearGreed, RefreshTrigger::Manual)
            .await;
        assert_eq!(second, Some(CycleOutcome::AlreadyRunning));

        gate.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(first, Some(CycleOutcome::Published(_))));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_rejected() {
        let scheduler = scheduler(CountingSource::new(), clock());
        assert!(scheduler.subscribe(MetricKind::Dominance, |_| Ok(())).is_none());
        assert!(scheduler
            .refresh(MetricKind::Dominance, RefreshTrigger::Manual)
            .await
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_refreshes_on_start_and_each_slot_until_cancelled() {
        let source = CountingSource::new();
        let scheduler = Arc::new(scheduler(source.clone(), clock()));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn({
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            async move { scheduler.run(shutdown).await }
        });

        // 시작 갱신 + 120초 후, 240초 후
        tokio::time::sleep(Duration::from_secs(250)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(source.calls(), 3);
    }

    /// tokio 가상 시간을 따라가는 시계.
    struct TokioClock {
        base: DateTime<Utc>,
        started: tokio::time::Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = chrono::Duration::from_std(self.started.elapsed()).unwrap();
            self.base + elapsed
        }
    }

    /// 호출 시각을 기록하는 소스.
    struct TimedSource {
        clock: Arc<TokioClock>,
        fired: Mutex<Vec<DateTime<Utc>>>,
    }

    #[async_trait]
    impl SnapshotSource for TimedSource {
        fn kind(&self) -> MetricKind {
            MetricKind::FearGreed
        }

        async fn fetch(&self) -> Result<Snapshot, FetchError> {
            self.fired.lock().unwrap().push(self.clock.now());
            Ok(Snapshot::FearGreed(SentimentReading {
                value: 50,
                classification: "Neutral".to_string(),
                timestamp: 0,
                time_until_update: None,
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_keeps_aligned_schedule() {
        let clock = Arc::new(TokioClock {
            base: Utc.with_ymd_and_hms(2024, 1, 9, 12, 3, 0).unwrap(),
            started: tokio::time::Instant::now(),
        });
        let source = Arc::new(TimedSource {
            clock: clock.clone(),
            fired: Mutex::new(Vec::new()),
        });
        let dyn_source: Arc<dyn SnapshotSource> = source.clone();
        let scheduler = Arc::new(RefreshScheduler::new(
            vec![dyn_source],
            Alignment::new(Duration::from_secs(300), Duration::from_secs(1)),
            clock.clone(),
        ));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn({
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            async move { scheduler.run(shutdown).await }
        });

        // 12:06:20, 12:05 정기 실행과 12:10 정기 실행 사이
        tokio::time::sleep(Duration::from_secs(200)).await;
        let manual = scheduler
            .refresh(MetricKind::FearGreed, RefreshTrigger::Manual)
            .await;
        assert!(matches!(manual, Some(CycleOutcome::Published(_))));

        tokio::time::sleep(Duration::from_secs(230)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let fired: Vec<String> = source
            .fired
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.format("%H:%M:%S").to_string())
            .collect();
        assert_eq!(fired, vec!["12:03:00", "12:05:00", "12:06:20", "12:10:00"]);
    }

    fn listing_item(symbol: &str, rank: u32, change: f64) -> serde_json::Value {
        json!({
            "id": rank, "name": symbol, "symbol": symbol, "cmc_rank": rank,
            "quote": { "USD": {
                "price": 10.0, "market_cap": 5.0e10, "volume_24h": 2.0e9,
                "percent_change_24h": change
            }}
        })
    }

    #[tokio::test]
    async fn test_dominance_cycle_persists_movers_and_merged_history() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/global-metrics/quotes/latest")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                json!({ "data": {
                    "btc_dominance": 52.0, "eth_dominance": 17.0,
                    "quote": { "USD": { "total_market_cap": 1.6e12, "total_volume_24h": 6.0e10 } }
                }})
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/v1/cryptocurrency/listings/latest")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                json!({ "data": [
                    listing_item("BTC", 1, 2.0),
                    listing_item("ETH", 2, -3.0),
                    listing_item("USDT", 3, 0.5),
                    listing_item("SOL", 4, 8.0),
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let clock = clock();
        let store = Arc::new(MemoryDocumentStore::new());
        let gateway = CacheGateway::new(store, clock.clone());
        let seeded = json!({
            "historicalData": [
                { "date": "2024-01-08", "btcDominance": 51.0, "ethDominance": 17.5, "othersDominance": 31.5 }
            ]
        })
        .as_object()
        .cloned()
        .unwrap();
        gateway.upsert(MetricKind::Dominance, seeded).await.unwrap();

        let client = Arc::new(ResilientClient::new(
            Arc::new(ReqwestTransport::new().unwrap()),
            FetchConfig {
                timeout: Duration::from_secs(5),
                retry_base: Duration::from_millis(1),
            },
        ));
        let adapter = DominanceAdapter::new(
            client,
            Endpoint::coinmarketcap("cmc-key").with_base_url(server.url()),
            None,
            clock.clone(),
        )
        .unwrap();
        let source: Arc<dyn SnapshotSource> =
            Arc::new(DominanceSource::new(adapter, MoverFilter::default()));
        let scheduler = RefreshScheduler::new(
            vec![source],
            Alignment::new(Duration::from_secs(300), Duration::from_secs(1)),
            clock,
        );

        let (writer, task) = CacheWriter::spawn(gateway.clone());
        scheduler.subscribe(MetricKind::Dominance, writer.handler()).unwrap();
        drop(writer);

        let outcome = scheduler
            .refresh(MetricKind::Dominance, RefreshTrigger::Manual)
            .await
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Published(PublishReport { delivered: 1, failed: 0 }));

        drop(scheduler);
        task.await.unwrap();

        let document = gateway.get(MetricKind::Dominance).await.unwrap();
        let symbols = |side: &str| -> Vec<String> {
            document.data["topMovers"][side]
                .as_array()
                .unwrap()
                .iter()
                .map(|m| m["symbol"].as_str().unwrap().to_string())
                .collect()
        };
        assert_eq!(symbols("gainers"), vec!["SOL", "BTC"]);
        assert_eq!(symbols("losers"), vec!["ETH"]);

        let history = document.data["historicalData"].as_array().unwrap();
        let dates: Vec<_> = history.iter().map(|p| p["date"].as_str().unwrap()).collect();
        assert_eq!(dates, vec!["2024-01-08", "2024-01-09"]);
        assert_eq!(history[1]["btcDominance"], 52.0);
    }
}

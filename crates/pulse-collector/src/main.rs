//! Market Pulse collector CLI.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use pulse_collector::{
    build_sources, config::ScheduleConfig, CacheWriter, CollectorConfig, RefreshScheduler,
    RefreshTrigger,
};
use pulse_core::{init_logging, LogConfig, MetricKind, SharedClock, SystemClock};
use pulse_data::{CacheGateway, DatabaseConfig, PgDocumentStore};

#[derive(Parser)]
#[command(name = "pulse-collector")]
#[command(about = "Market Pulse metric collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 데몬 모드: 벽시계 정렬 주기로 모든 지표 갱신
    Daemon,

    /// 지표를 한 번 갱신하고 종료
    Refresh {
        /// 특정 지표만 갱신 (dominance, fear-greed)
        #[arg(long)]
        kind: Option<MetricKind>,
    },

    /// 다음 정기 갱신 시각 출력
    NextFire,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(
        LogConfig::new(format!(
            "pulse_collector={level},pulse_data={level}",
            level = cli.log_level
        ))
        .with_env_format(),
    )?;

    let clock: SharedClock = Arc::new(SystemClock);

    if let Commands::NextFire = cli.command {
        let alignment = ScheduleConfig::from_env().alignment();
        let next = alignment.next_fire_at(clock.now());
        println!("{}", next.to_rfc3339());
        return Ok(());
    }

    tracing::info!("Market Pulse Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(
        interval_minutes = config.schedule.interval_minutes,
        proxies = config.fetch.proxy_urls.len(),
        "설정 로드 완료"
    );

    // DB 연결
    let store = PgDocumentStore::connect(&DatabaseConfig::new(config.database_url.clone())).await?;
    store.migrate().await?;
    tracing::info!("데이터베이스 연결 성공");

    let gateway = CacheGateway::new(Arc::new(store.clone()), clock.clone());
    let (writer, writer_task) = CacheWriter::spawn(gateway);

    let scheduler = RefreshScheduler::new(
        build_sources(&config, clock.clone())?,
        config.schedule.alignment(),
        clock,
    );
    for kind in scheduler.kinds() {
        scheduler.subscribe(kind, writer.handler());
    }
    drop(writer);

    match cli.command {
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.schedule.interval_minutes
            );

            let shutdown = CancellationToken::new();
            tokio::spawn(wait_for_signal(shutdown.clone()));

            scheduler.run(shutdown).await;
        }
        Commands::Refresh { kind: Some(kind) } => {
            match scheduler.refresh(kind, RefreshTrigger::Manual).await {
                Some(outcome) => tracing::info!(kind = %kind, outcome = ?outcome, "수동 갱신 완료"),
                None => tracing::warn!(kind = %kind, "등록되지 않은 지표"),
            }
        }
        Commands::Refresh { kind: None } => {
            scheduler
                .refresh_all(RefreshTrigger::Manual)
                .await
                .log_summary("수동 갱신");
        }
        Commands::NextFire => {}
    }

    // 구독 핸들러가 모두 사라지면 기록 태스크가 남은 스냅샷을 저장하고 끝납니다.
    drop(scheduler);
    writer_task.await?;

    store.pool().close().await;
    tracing::info!("Collector 종료");

    Ok(())
}

/// Ctrl+C 또는 SIGTERM 수신 시 토큰 취소.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C 핸들러 설치 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("종료 신호 수신, 데몬 종료 중...");
    shutdown.cancel();
}

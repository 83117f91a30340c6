//! Market Pulse API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 캐시 문서 조회/upsert와 헬스 체크 엔드포인트를 제공합니다.

use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use pulse_api::{create_api_router, AppState, ServerConfig};
use pulse_core::{init_logging, LogConfig, SharedClock, SystemClock};
use pulse_data::{
    CacheGateway, DatabaseConfig, MemoryDocumentStore, PgDocumentStore, SharedDocumentStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogConfig::new("pulse_api=info,pulse_data=info,tower_http=info").with_env_format())?;

    info!("Starting Market Pulse API server...");

    let config = ServerConfig::from_env();
    let addr = config.socket_addr().map_err(|e| {
        error!(
            host = %config.host,
            port = config.port,
            error = %e,
            "소켓 주소 설정이 유효하지 않습니다. API_HOST, API_PORT 환경변수를 확인하세요."
        );
        e
    })?;

    let use_memory = std::env::args().any(|arg| arg == "--memory");
    let (store, pg) = create_store(&config, use_memory).await?;

    let clock: SharedClock = Arc::new(SystemClock);
    let state = Arc::new(AppState::new(CacheGateway::new(store, clock)));
    info!(version = %state.version, persistent = pg.is_some(), "Application state initialized");

    let app = create_router(state, &config);

    info!(%addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown initiated, cleaning up...");
    if let Some(pg) = pg {
        pg.pool().close().await;
    }
    info!("Server stopped gracefully");

    Ok(())
}

/// 저장소 생성.
///
/// `--memory` 플래그가 있거나 `DATABASE_URL`이 없으면 인메모리 저장소를 씁니다.
async fn create_store(
    config: &ServerConfig,
    use_memory: bool,
) -> Result<(SharedDocumentStore, Option<PgDocumentStore>), Box<dyn std::error::Error>> {
    let url = match (&config.database_url, use_memory) {
        (Some(url), false) => url.clone(),
        (None, false) => {
            warn!("DATABASE_URL not set, using in-memory store (development mode)");
            let store: SharedDocumentStore = Arc::new(MemoryDocumentStore::new());
            return Ok((store, None));
        }
        (_, true) => {
            info!("Using in-memory store");
            let store: SharedDocumentStore = Arc::new(MemoryDocumentStore::new());
            return Ok((store, None));
        }
    };

    let pg = PgDocumentStore::connect(&DatabaseConfig::new(url)).await?;
    if config.run_migrations {
        pg.migrate().await?;
    }
    info!("데이터베이스 연결 성공");

    let store: SharedDocumentStore = Arc::new(pg.clone());
    Ok((store, Some(pg)))
}

/// 라우터와 미들웨어 구성.
fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(cors_layer(&config.cors_origins))
}

/// CORS 미들웨어 구성.
///
/// 허용 origin 목록이 비어 있으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();

    let allow_origin = if parsed.is_empty() {
        if origins.is_empty() {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
        } else {
            warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
        }
        AllowOrigin::any()
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Ctrl+C 또는 SIGTERM 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

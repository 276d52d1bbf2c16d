#![forbid(unsafe_code)]

use insights_panel_server::{
    build_router, validate_startup_config_contract, ApiConfig, AppState, GoogleSheetsBackend,
    LocalJsonBackend, RetryPolicy, ServiceAccountKey, SheetCacheConfig, SheetCacheManager,
    SheetStoreBackend,
};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_list(name: &str, default: &[&str]) -> Vec<String> {
    let parsed: Vec<String> = env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect();
    if parsed.is_empty() {
        default.iter().map(|s| (*s).to_string()).collect()
    } else {
        parsed
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("PANEL_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("PANEL_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

    let cache_cfg = SheetCacheConfig {
        worksheet_titles: env_list(
            "PANEL_WORKSHEETS",
            &["BANCO_INSIGHTS", "MARCAS", "PLATAFORMAS"],
        ),
        slow_fetch_warn: env_duration_ms("PANEL_SLOW_FETCH_WARN_MS", 2000),
    };
    let api_cfg = ApiConfig {
        max_body_bytes: env_usize("PANEL_MAX_BODY_BYTES", 16 * 1024),
        request_timeout: env_duration_ms("PANEL_REQUEST_TIMEOUT_MS", 10_000),
        data_ttl: env_duration_ms("PANEL_DATA_TTL_MS", 30_000),
        metadata_ttl: env_duration_ms("PANEL_METADATA_TTL_MS", 300_000),
        slow_request_threshold: env_duration_ms("PANEL_SLOW_REQUEST_THRESHOLD_MS", 500),
    };
    validate_startup_config_contract(&api_cfg, &cache_cfg)?;

    let retry = RetryPolicy {
        max_attempts: env_usize("PANEL_STORE_RETRY_ATTEMPTS", 4),
        base_backoff_ms: env_u64("PANEL_STORE_RETRY_BASE_MS", 120),
    };
    let store: Arc<dyn SheetStoreBackend> = if let Ok(root) = env::var("PANEL_STORE_LOCAL_ROOT") {
        Arc::new(LocalJsonBackend::new(PathBuf::from(root)))
    } else {
        let spreadsheet_id = env::var("PANEL_SPREADSHEET_ID").map_err(|_| {
            "PANEL_SPREADSHEET_ID is required unless PANEL_STORE_LOCAL_ROOT is set".to_string()
        })?;
        let key_path = env::var("PANEL_SERVICE_ACCOUNT_KEY")
            .unwrap_or_else(|_| "service_account_key.json".to_string());
        // Startup probe only; the backend re-reads the key per token mint.
        if let Err(e) = ServiceAccountKey::from_file(std::path::Path::new(&key_path)) {
            tracing::warn!("service account key not usable at startup: {e}");
        }
        Arc::new(GoogleSheetsBackend::new(
            spreadsheet_id,
            PathBuf::from(key_path),
            retry,
        ))
    };

    let cache = SheetCacheManager::new(cache_cfg, store);
    let state = AppState::with_config(cache, api_cfg);
    let app = build_router(state.clone());

    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;
    info!("insights-panel-server listening on {bind_addr}");
    let ready = state.ready.clone();
    ready.store(true, Ordering::Relaxed);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            ready.store(false, Ordering::Relaxed);
            let drain_ms = env_u64("PANEL_SHUTDOWN_DRAIN_MS", 5000);
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}

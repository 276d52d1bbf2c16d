#![forbid(unsafe_code)]

use async_trait::async_trait;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use insights_panel_api::ApiError;
use insights_panel_model::{BrandRow, InsightRow, PlatformRow, SheetRow};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

mod config;
mod http;
mod store;
mod telemetry;

pub const CRATE_NAME: &str = "insights-panel-server";

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for StoreError {}

pub use config::{validate_startup_config_contract, ApiConfig, CONFIG_SCHEMA_VERSION};
pub use store::backends::{GoogleSheetsBackend, LocalJsonBackend, RetryPolicy, ServiceAccountKey};
pub use store::fake::FakeSheetStore;

/// Outcome of fetching one worksheet. A missing worksheet is a normal
/// condition, not an error; the cache manager substitutes an empty table.
pub enum WorksheetFetch {
    Found(Vec<SheetRow>),
    NotFound,
}

#[async_trait]
pub trait SheetStoreBackend: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;
    async fn fetch_worksheet(&self, title: &str) -> Result<WorksheetFetch, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorksheetKind {
    Insights,
    Brands,
    Platforms,
}

/// Maps a worksheet title to its stable table via case-insensitive
/// substring match, so `BANCO_INSIGHTS` and `Insights 2024` both land
/// on the insights table. Unrecognized titles yield `None`.
fn classify_worksheet(title: &str) -> Option<WorksheetKind> {
    let key = title.trim().to_lowercase();
    if key.contains("insight") {
        Some(WorksheetKind::Insights)
    } else if key.contains("marca") {
        Some(WorksheetKind::Brands)
    } else if key.contains("plataform") {
        Some(WorksheetKind::Platforms)
    } else {
        None
    }
}

/// The three typed tables one full fetch yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub insights: Vec<InsightRow>,
    pub brands: Vec<BrandRow>,
    pub platforms: Vec<PlatformRow>,
}

#[derive(Debug, Clone)]
pub struct SheetCacheConfig {
    pub worksheet_titles: Vec<String>,
    pub slow_fetch_warn: Duration,
}

impl Default for SheetCacheConfig {
    fn default() -> Self {
        Self {
            worksheet_titles: vec![
                "BANCO_INSIGHTS".to_string(),
                "MARCAS".to_string(),
                "PLATAFORMAS".to_string(),
            ],
            slow_fetch_warn: Duration::from_secs(2),
        }
    }
}

#[derive(Default)]
pub struct CacheMetrics {
    pub workbook_hits: AtomicU64,
    pub workbook_misses: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub worksheet_missing_total: AtomicU64,
    pub fetch_latency_ns: Mutex<Vec<u64>>,
}

#[derive(Default)]
struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_insert_with(Vec::new)
            .push(latency.as_nanos() as u64);
    }
}

/// Single-slot workbook cache. The first successful fetch is kept for
/// the life of the process; there is no TTL and no invalidation, so a
/// restart is the only refresh mechanism. Fetch failures are never
/// cached: a failed attempt yields an empty workbook and the next
/// caller retries.
pub struct SheetCacheManager {
    cfg: SheetCacheConfig,
    store: Arc<dyn SheetStoreBackend>,
    slot: Mutex<Option<Arc<Workbook>>>,
    inflight: Mutex<()>,
    pub metrics: Arc<CacheMetrics>,
}

impl SheetCacheManager {
    pub fn new(cfg: SheetCacheConfig, store: Arc<dyn SheetStoreBackend>) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            store,
            slot: Mutex::new(None),
            inflight: Mutex::new(()),
            metrics: Arc::new(CacheMetrics::default()),
        })
    }

    pub async fn workbook(&self) -> Arc<Workbook> {
        if let Some(cached) = self.slot.lock().await.clone() {
            self.metrics.workbook_hits.fetch_add(1, Ordering::Relaxed);
            return cached;
        }
        self.metrics.workbook_misses.fetch_add(1, Ordering::Relaxed);

        // Single-flight: the first caller holds the lock while fetching;
        // concurrent callers queue here and pick up the cached value.
        let _guard = self.inflight.lock().await;
        if let Some(cached) = self.slot.lock().await.clone() {
            return cached;
        }

        let started = Instant::now();
        match self.fetch_workbook().await {
            Ok(workbook) => {
                let elapsed = started.elapsed();
                if elapsed > self.cfg.slow_fetch_warn {
                    warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        backend = self.store.backend_tag(),
                        "slow workbook fetch"
                    );
                }
                self.metrics
                    .fetch_latency_ns
                    .lock()
                    .await
                    .push(elapsed.as_nanos() as u64);
                info!(
                    insights = workbook.insights.len(),
                    brands = workbook.brands.len(),
                    platforms = workbook.platforms.len(),
                    "workbook cached"
                );
                let workbook = Arc::new(workbook);
                *self.slot.lock().await = Some(Arc::clone(&workbook));
                workbook
            }
            Err(e) => {
                self.metrics.fetch_failures.fetch_add(1, Ordering::Relaxed);
                warn!(backend = self.store.backend_tag(), "workbook fetch failed: {e}");
                Arc::new(Workbook::default())
            }
        }
    }

    /// Clears the slot. For tests; nothing routes here at runtime.
    pub async fn reset(&self) {
        *self.slot.lock().await = None;
    }

    async fn fetch_workbook(&self) -> Result<Workbook, StoreError> {
        let mut workbook = Workbook::default();
        for title in &self.cfg.worksheet_titles {
            let Some(kind) = classify_worksheet(title) else {
                warn!(worksheet = %title, "unrecognized worksheet title; dropping");
                continue;
            };
            let rows = match self.store.fetch_worksheet(title).await? {
                WorksheetFetch::Found(rows) => rows,
                WorksheetFetch::NotFound => {
                    self.metrics
                        .worksheet_missing_total
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(worksheet = %title, "worksheet not found; substituting empty table");
                    Vec::new()
                }
            };
            match kind {
                WorksheetKind::Insights => {
                    workbook.insights = rows.iter().map(InsightRow::from_sheet_row).collect();
                }
                WorksheetKind::Brands => {
                    workbook.brands = rows.iter().filter_map(BrandRow::from_sheet_row).collect();
                }
                WorksheetKind::Platforms => {
                    workbook.platforms =
                        rows.iter().filter_map(PlatformRow::from_sheet_row).collect();
                }
            }
        }
        Ok(workbook)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SheetCacheManager>,
    pub api: ApiConfig,
    pub ready: Arc<AtomicBool>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(cache: Arc<SheetCacheManager>) -> Self {
        Self::with_config(cache, ApiConfig::default())
    }

    #[must_use]
    pub fn with_config(cache: Arc<SheetCacheManager>, api: ApiConfig) -> Self {
        Self {
            cache,
            api,
            ready: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

fn cors_layer() -> CorsLayer {
    // The panel frontend is served from arbitrary origins; mirror the
    // allow-all policy the API has always had.
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route("/v1/version", get(http::handlers::version_handler))
        .route("/api/getMetadata", get(http::handlers::get_metadata_handler))
        .route("/api/getData", get(http::handlers::get_data_handler))
        .route("/api/data", post(http::handlers::post_data_handler))
        .route("/api/options", post(http::handlers::post_options_handler))
        .layer(cors_layer())
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}

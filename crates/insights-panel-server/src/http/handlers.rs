// SPDX-License-Identifier: Apache-2.0

use crate::*;
use axum::extract::rejection::JsonRejection;
use axum::http::header::CONTENT_TYPE;
use insights_panel_api::{
    params_from_body, parse_data_query, DataRequestBody, DataRequestParams, DataResponseDto,
    MetadataResponseDto,
};
use insights_panel_query::{
    apply_filters, brand_platform_pairs, distinct_options, finalize, normalize,
};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tokio::time::timeout;

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| make_request_id(state))
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

fn api_error_response(status: StatusCode, err: &ApiError) -> Response {
    (status, Json(json!({"error": err}))).into_response()
}

fn if_none_match(headers: &HeaderMap) -> Option<String> {
    headers
        .get("if-none-match")
        .and_then(|v| v.to_str().ok())
        .map(std::string::ToString::to_string)
}

fn put_cache_headers(headers: &mut HeaderMap, ttl: Duration, etag: &str) {
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
        headers.insert("cache-control", value);
    }
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert("etag", value);
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn payload_etag(bytes: &[u8]) -> String {
    format!("\"{}\"", sha256_hex(bytes))
}

fn serialize_payload<T: Serialize>(payload: &T, pretty: bool) -> Vec<u8> {
    if pretty {
        serde_json::to_vec_pretty(payload).unwrap_or_default()
    } else {
        serde_json::to_vec(payload).unwrap_or_default()
    }
}

fn json_bytes_response(bytes: Vec<u8>) -> Response {
    ([(CONTENT_TYPE, "application/json")], bytes).into_response()
}

/// Bounds the fetch-plus-pipeline work; a timeout degrades to the same
/// empty workbook a failed fetch yields.
async fn workbook_bounded(state: &AppState) -> Arc<Workbook> {
    match timeout(state.api.request_timeout, state.cache.workbook()).await {
        Ok(workbook) => workbook,
        Err(_) => {
            warn!("workbook fetch timed out; serving empty data");
            Arc::new(Workbook::default())
        }
    }
}

/// Deduplicated, sorted universes from the lookup tables, independent
/// of any filter on insights.
fn lookup_universes(workbook: &Workbook) -> (Vec<String>, Vec<String>) {
    let brands: BTreeSet<String> = workbook.brands.iter().map(|b| b.brand.clone()).collect();
    let platforms: BTreeSet<String> = workbook
        .platforms
        .iter()
        .map(|p| p.platform.clone())
        .collect();
    (
        brands.into_iter().collect(),
        platforms.into_iter().collect(),
    )
}

async fn data_payload(state: &AppState, params: &DataRequestParams) -> DataResponseDto {
    let workbook = workbook_bounded(state).await;
    let (brands, platforms) = lookup_universes(&workbook);
    let table = apply_filters(normalize(&workbook.insights), &params.criteria);
    let pairs = params
        .include_pairs
        .then(|| brand_platform_pairs(&table, &brands, &platforms));
    let insights = finalize(table, params.sort);
    DataResponseDto {
        insights,
        brands,
        platforms,
        pairs,
    }
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let resp = (StatusCode::OK, "ok").into_response();
    state
        .metrics
        .observe_request("/healthz", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let (status, body) = if state.ready.load(Ordering::Relaxed) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready")
    };
    let resp = (status, body).into_response();
    state
        .metrics
        .observe_request("/readyz", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    crate::telemetry::metrics_endpoint::metrics_handler(State(state)).await
}

pub(crate) async fn version_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let payload = json!({
        "server": {
            "name": "insights-panel",
            "crate": CRATE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "config_schema_version": CONFIG_SCHEMA_VERSION,
        }
    });
    let mut response = Json(payload).into_response();
    if let Ok(value) = HeaderValue::from_str("public, max-age=30") {
        response.headers_mut().insert("cache-control", value);
    }
    state
        .metrics
        .observe_request("/v1/version", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(response, &request_id)
}

pub(crate) async fn get_metadata_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    info!(request_id = %request_id, route = "/api/getMetadata", "request start");
    let workbook = workbook_bounded(&state).await;
    let (brands, platforms) = lookup_universes(&workbook);
    let payload = MetadataResponseDto { brands, platforms };
    let bytes = serialize_payload(&payload, false);
    let etag = payload_etag(&bytes);
    if if_none_match(&headers).as_deref() == Some(etag.as_str()) {
        let mut resp = StatusCode::NOT_MODIFIED.into_response();
        put_cache_headers(resp.headers_mut(), state.api.metadata_ttl, &etag);
        state
            .metrics
            .observe_request("/api/getMetadata", StatusCode::NOT_MODIFIED, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }
    let mut resp = json_bytes_response(bytes);
    put_cache_headers(resp.headers_mut(), state.api.metadata_ttl, &etag);
    state
        .metrics
        .observe_request("/api/getMetadata", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn get_data_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    info!(request_id = %request_id, route = "/api/getData", "request start");
    let params = match parse_data_query(&query) {
        Ok(params) => params,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, &err);
            state
                .metrics
                .observe_request("/api/getData", StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };
    let payload = data_payload(&state, &params).await;
    let bytes = serialize_payload(&payload, params.pretty);
    let etag = payload_etag(&bytes);
    if if_none_match(&headers).as_deref() == Some(etag.as_str()) {
        let mut resp = StatusCode::NOT_MODIFIED.into_response();
        put_cache_headers(resp.headers_mut(), state.api.data_ttl, &etag);
        state
            .metrics
            .observe_request("/api/getData", StatusCode::NOT_MODIFIED, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }
    let mut resp = json_bytes_response(bytes);
    put_cache_headers(resp.headers_mut(), state.api.data_ttl, &etag);
    if started.elapsed() > state.api.slow_request_threshold {
        warn!(request_id = %request_id, route = "/api/getData", "slow request");
    }
    state
        .metrics
        .observe_request("/api/getData", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn post_data_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DataRequestBody>, JsonRejection>,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    info!(request_id = %request_id, route = "/api/data", "request start");
    let params = match parse_body_params(body) {
        Ok(params) => params,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, &err);
            state
                .metrics
                .observe_request("/api/data", StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };
    let payload = data_payload(&state, &params).await;
    let resp = json_bytes_response(serialize_payload(&payload, false));
    if started.elapsed() > state.api.slow_request_threshold {
        warn!(request_id = %request_id, route = "/api/data", "slow request");
    }
    state
        .metrics
        .observe_request("/api/data", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn post_options_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DataRequestBody>, JsonRejection>,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    info!(request_id = %request_id, route = "/api/options", "request start");
    let params = match parse_body_params(body) {
        Ok(params) => params,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, &err);
            state
                .metrics
                .observe_request("/api/options", StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };
    let workbook = workbook_bounded(&state).await;
    let table = apply_filters(normalize(&workbook.insights), &params.criteria);
    let payload = distinct_options(&table);
    let resp = json_bytes_response(serialize_payload(&payload, false));
    state
        .metrics
        .observe_request("/api/options", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

fn parse_body_params(
    body: Result<Json<DataRequestBody>, JsonRejection>,
) -> Result<DataRequestParams, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::invalid_body(&e.body_text()))?;
    params_from_body(&body)
}

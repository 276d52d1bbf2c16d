use crate::http::handlers::{make_request_id, with_request_id};
use crate::*;

const METRIC_SUBSYSTEM: &str = "insights";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let cache = &state.cache.metrics;
    let mut body = format!(
        "panel_workbook_hits{{subsystem=\"{}\",version=\"{}\"}} {}\n\
panel_workbook_misses{{subsystem=\"{}\",version=\"{}\"}} {}\n\
panel_workbook_fetch_failure_total{{subsystem=\"{}\",version=\"{}\"}} {}\n\
panel_worksheet_missing_total{{subsystem=\"{}\",version=\"{}\"}} {}\n",
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        cache.workbook_hits.load(Ordering::Relaxed),
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        cache.workbook_misses.load(Ordering::Relaxed),
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        cache.fetch_failures.load(Ordering::Relaxed),
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        cache.worksheet_missing_total.load(Ordering::Relaxed),
    );
    let fetch_lat = cache.fetch_latency_ns.lock().await.clone();
    body.push_str(&format!(
        "panel_workbook_fetch_p95_seconds{{subsystem=\"{}\",version=\"{}\"}} {:.6}\n",
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        percentile_ns(&fetch_lat, 0.95) as f64 / 1_000_000_000.0
    ));

    let req_counts = state.metrics.counts.lock().await.clone();
    for ((route, status), count) in req_counts {
        body.push_str(&format!(
            "panel_http_requests_total{{subsystem=\"{}\",version=\"{}\",route=\"{}\",status=\"{}\"}} {}\n",
            METRIC_SUBSYSTEM, METRIC_VERSION, route, status, count
        ));
    }
    let req_lat = state.metrics.latency_ns.lock().await.clone();
    for (route, vals) in req_lat {
        body.push_str(&format!(
            "panel_http_request_latency_p95_seconds{{subsystem=\"{}\",version=\"{}\",route=\"{}\"}} {:.6}\n",
            METRIC_SUBSYSTEM,
            METRIC_VERSION,
            route,
            percentile_ns(&vals, 0.95) as f64 / 1_000_000_000.0
        ));
    }
    let resp = (StatusCode::OK, body).into_response();
    state
        .metrics
        .observe_request("/metrics", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile_ns(&[], 0.95), 0);
    }

    #[test]
    fn percentile_picks_the_upper_tail() {
        let values: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile_ns(&values, 0.95), 95);
    }
}

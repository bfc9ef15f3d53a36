use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use promptboard_domain::scoring::RecomputeReport;

const HTTP_REQUESTS_TOTAL: &str = "promptboard_api_http_requests_total";
const HTTP_REQUEST_DURATION_SECONDS: &str = "promptboard_api_http_request_duration_seconds";
const HTTP_REQUEST_ERRORS_TOTAL: &str = "promptboard_api_http_errors_total";
const UPVOTES_TOTAL: &str = "promptboard_api_upvotes_total";
const SUBMISSIONS_TOTAL: &str = "promptboard_api_submissions_total";
const RECOMPUTE_PROMPTS_TOTAL: &str = "promptboard_api_recompute_prompts_total";
const RECOMPUTE_DURATION_SECONDS: &str = "promptboard_api_recompute_duration_seconds";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

pub fn register_http_request(method: &str, route: &str, status: StatusCode, elapsed: Duration) {
    let status_code = status.as_u16().to_string();
    let duration_seconds = elapsed.as_secs_f64();
    let result = if status.is_server_error() {
        "error"
    } else {
        "success"
    };

    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status_code.clone(),
        "result" => result
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status_code
    )
    .record(duration_seconds);

    if status.is_server_error() {
        counter!(
            HTTP_REQUEST_ERRORS_TOTAL,
            "method" => method.to_string(),
            "route" => route.to_string(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);
    }
}

/// `result` is `accepted`, `duplicate`, `rejected` or `error`.
pub fn register_upvote(result: &'static str) {
    counter!(UPVOTES_TOTAL, "result" => result).increment(1);
}

pub fn register_submission(result: &'static str) {
    counter!(SUBMISSIONS_TOTAL, "result" => result).increment(1);
}

pub fn register_recompute(report: &RecomputeReport, elapsed: Duration) {
    for (outcome, count) in [
        ("updated", report.updated),
        ("superseded", report.superseded),
        ("failed", report.failed),
    ] {
        counter!(RECOMPUTE_PROMPTS_TOTAL, "trigger" => "admin", "outcome" => outcome)
            .increment(count);
    }
    histogram!(RECOMPUTE_DURATION_SECONDS, "trigger" => "admin").record(elapsed.as_secs_f64());
}

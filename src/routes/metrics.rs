use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// GET /metrics — job, parse and match counters in Prometheus text format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for every metric the service records.
pub fn describe_metrics() {
    metrics::describe_counter!("statement_uploads_total", "Statements uploaded and queued for parsing");
    metrics::describe_counter!("jobs_claimed_total", "Jobs claimed by a worker");
    metrics::describe_counter!("jobs_completed_total", "Jobs completed successfully");
    metrics::describe_counter!("jobs_failed_total", "Jobs failed after their last attempt");
    metrics::describe_counter!("jobs_retried_total", "Failed job attempts returned to the queue");
    metrics::describe_histogram!("job_duration_seconds", "Time spent running one job attempt");
    metrics::describe_counter!("transactions_parsed_total", "Transaction records written by parse jobs");
    metrics::describe_counter!(
        "transactions_auto_matched_total",
        "Transaction records linked to an expense by the auto-matcher"
    );
}

//! Prometheus metrics helpers.
//!
//! Observability only — nothing here feeds back into request handling.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(
        "tubecast_requests_total",
        "Requests handled, labeled by endpoint and status"
    );
    describe_histogram!(
        "tubecast_request_duration_seconds",
        "Request handling duration, labeled by endpoint"
    );
    describe_counter!(
        "tubecast_origin_errors_total",
        "Upstream fetches that failed after all retries"
    );
    describe_gauge!(
        "tubecast_inflight_requests",
        "Requests currently being handled"
    );
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "tubecast_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("tubecast_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_origin_error() {
    counter!("tubecast_origin_errors_total").increment(1);
}

pub fn set_inflight(count: usize) {
    gauge!("tubecast_inflight_requests").set(count as f64);
}

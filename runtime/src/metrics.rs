//! Metrics emitted by the render pipeline.
//!
//! Recording goes through the `metrics` facade. Without an installed recorder
//! every call is a no-op, so exporting is left to the binary that embeds the
//! pipeline.

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Rendered requests, labelled by response status.
pub const REQUESTS_TOTAL: &str = "ssr_requests_total";
/// Failed renders, labelled by failing stage.
pub const RENDER_FAILURES_TOTAL: &str = "ssr_render_failures_total";
/// Time from opening the request context to an assembled document.
pub const RENDER_DURATION_SECONDS: &str = "ssr_render_duration_seconds";
/// Session cookies captured from nested backend calls.
pub const CAPTURED_COOKIES_TOTAL: &str = "ssr_captured_cookies_total";

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(REQUESTS_TOTAL, "Requests answered by the SSR handler");
    describe_counter!(RENDER_FAILURES_TOTAL, "Renders that ended in a 500");
    describe_histogram!(
        RENDER_DURATION_SECONDS,
        Unit::Seconds,
        "Time spent resolving, rendering and assembling a page"
    );
    describe_counter!(
        CAPTURED_COOKIES_TOTAL,
        "Set-Cookie values captured from nested API responses"
    );
}

/// Count one answered request.
pub fn record_request(status: u16) {
    counter!(REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
}

/// Count one failed render.
pub fn record_failure(stage: &'static str) {
    counter!(RENDER_FAILURES_TOTAL, "stage" => stage).increment(1);
}

/// Record how long a render took.
pub fn record_render_duration(elapsed: Duration) {
    histogram!(RENDER_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

/// Count newly captured cookies.
pub fn record_captured_cookies(count: usize) {
    counter!(CAPTURED_COOKIES_TOTAL).increment(count as u64);
}

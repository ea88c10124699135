//! Packaging a finished job into an HTTP response.
//!
//! Failures go through [`AppError`](crate::error::AppError); this module
//! handles delivery of the artifact and the per-outcome metrics.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use sv_pipeline::AssemblyResult;

pub static X_VIDEO_DURATION: HeaderName = HeaderName::from_static("x-video-duration");
pub static X_VIDEO_SIZE: HeaderName = HeaderName::from_static("x-video-size");

const VIDEO_MP4: &str = "video/mp4";

/// Counter of finished jobs, labelled by outcome (`ok` or an error code).
pub const ASSEMBLY_TOTAL: &str = "slopvid_assembly_total";
/// Histogram of job wall-clock time in seconds.
pub const ASSEMBLY_SECONDS: &str = "slopvid_assembly_seconds";

/// `<prefix>-<YYYY-MM-DD>.mp4`
pub fn artifact_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}.mp4", date.format("%Y-%m-%d"))
}

/// Download filename for an artifact delivered today (local time).
pub fn todays_filename(prefix: &str) -> String {
    artifact_filename(prefix, chrono::Local::now().date_naive())
}

/// Seconds as a decimal string; whole numbers keep one decimal place.
pub fn format_duration(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{seconds:.1}")
    } else {
        seconds.to_string()
    }
}

/// Build the attachment response for a delivered video.
pub fn video_response(result: AssemblyResult, filename: &str) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let duration = HeaderValue::from_str(&format_duration(result.duration_seconds))
        .unwrap_or_else(|_| HeaderValue::from_static("0"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(VIDEO_MP4)),
            (header::CONTENT_DISPOSITION, disposition),
            (X_VIDEO_DURATION.clone(), duration),
            (X_VIDEO_SIZE.clone(), HeaderValue::from(result.size_bytes)),
        ],
        Body::from(result.artifact),
    )
        .into_response()
}

/// Record one finished job. A no-op when no recorder is installed.
pub fn record_outcome(outcome: &str, elapsed: Duration) {
    metrics::counter!(ASSEMBLY_TOTAL, "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!(ASSEMBLY_SECONDS).record(elapsed.as_secs_f64());
}

//! Unified error type for the assembly service.
//!
//! Every failure an assembly job can end in is funnelled into [`Error`].
//! Each variant belongs to exactly one [`ErrorKind`], which carries the
//! stable machine-readable code and the HTTP status used by API handlers.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// The fixed taxonomy of job failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The metadata payload failed to parse or validate.
    InvalidMetadata,
    /// Asset counts do not match the declared scenes.
    InvalidRequest,
    /// The aggregate upload size exceeds the configured ceiling.
    PayloadTooLarge,
    /// The engine could not find a referenced input.
    MissingFiles,
    /// The encode ran past its deadline and was cancelled.
    Timeout,
    /// The engine reported any other failure.
    EncodingError,
    /// Anything unanticipated.
    Internal,
}

impl ErrorKind {
    /// Stable wire code reported in failure bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidMetadata => "INVALID_METADATA",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorKind::MissingFiles => "MISSING_FILES",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::EncodingError => "FFMPEG_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Map this kind to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::InvalidMetadata => 400,
            ErrorKind::InvalidRequest => 400,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::MissingFiles => 400,
            ErrorKind::Timeout => 504,
            ErrorKind::EncodingError => 500,
            ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Unified error type covering all failure modes of an assembly job.
///
/// The `Display` output is the human message delivered to callers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The metadata payload is not valid JSON or violates the schema.
    #[error("Invalid metadata JSON: {0}")]
    InvalidMetadata(String),

    /// The request is well-formed but inconsistent (e.g. asset count mismatch).
    #[error("{0}")]
    InvalidRequest(String),

    /// The running upload total crossed the ceiling.
    #[error(
        "Upload size {} exceeds limit of {}",
        format_mb(.observed),
        format_mb(.limit)
    )]
    PayloadTooLarge {
        /// Bytes seen when the ceiling was crossed.
        observed: u64,
        /// The configured ceiling in bytes.
        limit: u64,
    },

    /// The engine was handed a path that does not exist.
    #[error("Input file not found: {}", path.display())]
    MissingFiles {
        /// The absent input.
        path: PathBuf,
    },

    /// The encode exceeded its deadline.
    #[error("Video assembly timed out after {deadline:?}")]
    Timeout {
        /// The deadline that elapsed.
        deadline: Duration,
    },

    /// The engine failed; `message` is its diagnostic text verbatim.
    #[error("{message}")]
    Encoding {
        /// Engine diagnostic.
        message: String,
    },

    /// An I/O operation failed outside the engine.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("{0}")]
    Internal(String),
}

fn format_mb(bytes: &u64) -> String {
    format!("{:.1} MB", *bytes as f64 / BYTES_PER_MB)
}

impl Error {
    /// The taxonomy entry this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidMetadata(_) => ErrorKind::InvalidMetadata,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Error::MissingFiles { .. } => ErrorKind::MissingFiles,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Encoding { .. } => ErrorKind::EncodingError,
            Error::Io { .. } | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// The human-readable message delivered to callers.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Convenience constructor for [`Error::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }

    /// Convenience constructor for [`Error::PayloadTooLarge`].
    pub fn payload_too_large(observed: u64, limit: u64) -> Self {
        Error::PayloadTooLarge { observed, limit }
    }

    /// Convenience constructor for [`Error::Encoding`].
    pub fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::MissingFiles`].
    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Error::MissingFiles { path: path.into() }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_metadata_display() {
        let err = Error::InvalidMetadata("expected value at line 1 column 1".into());
        assert_eq!(
            err.to_string(),
            "Invalid metadata JSON: expected value at line 1 column 1"
        );
        assert_eq!(err.kind(), ErrorKind::InvalidMetadata);
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code(), "INVALID_METADATA");
    }

    #[test]
    fn invalid_request_is_verbatim() {
        let err = Error::invalid_request("Expected 2 audio files, got 1");
        assert_eq!(err.to_string(), "Expected 2 audio files, got 1");
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    #[test]
    fn payload_too_large_reports_both_sizes_in_mb() {
        let err = Error::payload_too_large(40 * 1024 * 1024, 32 * 1024 * 1024);
        assert_eq!(
            err.to_string(),
            "Upload size 40.0 MB exceeds limit of 32.0 MB"
        );
        assert_eq!(err.http_status(), 413);
        assert_eq!(err.code(), "PAYLOAD_TOO_LARGE");
    }

    #[test]
    fn payload_too_large_rounds_to_one_decimal() {
        let err = Error::payload_too_large(33_554_433 + 100_000, 33_554_432);
        assert_eq!(
            err.to_string(),
            "Upload size 32.1 MB exceeds limit of 32.0 MB"
        );
    }

    #[test]
    fn missing_files_display() {
        let err = Error::missing_file("/tmp/job/image_0.jpg");
        assert_eq!(err.to_string(), "Input file not found: /tmp/job/image_0.jpg");
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code(), "MISSING_FILES");
    }

    #[test]
    fn timeout_display() {
        let err = Error::Timeout {
            deadline: Duration::from_secs(300),
        };
        assert_eq!(err.to_string(), "Video assembly timed out after 300s");
        assert_eq!(err.http_status(), 504);
        assert_eq!(err.code(), "TIMEOUT");
    }

    #[test]
    fn encoding_keeps_diagnostic_verbatim() {
        let err = Error::encoding("image_0.jpg: Invalid data found when processing input");
        assert_eq!(
            err.to_string(),
            "image_0.jpg: Invalid data found when processing input"
        );
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.code(), "FFMPEG_ERROR");
    }

    #[test]
    fn io_collapses_to_internal() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn internal_never_drops_message() {
        let err = Error::Internal("worker panicked".into());
        assert_eq!(err.to_string(), "worker panicked");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn kind_display_is_code() {
        assert_eq!(ErrorKind::Timeout.to_string(), "TIMEOUT");
        assert_eq!(ErrorKind::EncodingError.to_string(), "FFMPEG_ERROR");
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("download failed: expected file {} was not created", path.display())]
    DownloadMissing { path: PathBuf },
    #[error("error during processing: {message}")]
    ProcessingError { message: String },
    #[error("invalid time format: '{input}' (expected [[HH:]MM:]SS[.frac])")]
    InvalidTimeFormat { input: String },
    #[error("invalid time range: end ({end}) must be after start ({start})")]
    InvalidTimeRange { start: String, end: String },
    #[error("{program} not found (install it or point the config at it)")]
    ToolNotFound { program: String },
    #[error("{program} failed: {message}")]
    ProcessFailed { program: String, message: String },
    #[error("a job is already running")]
    Busy,
    #[error("job cancelled")]
    Cancelled,
    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("terminal error: {message}")]
    Terminal { message: String },
}

impl PipelineError {
    pub fn terminal(err: impl std::fmt::Display) -> Self {
        PipelineError::Terminal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn current_dir_failure_is_not_a_processing_error() {
        let err = PipelineError::CurrentDir(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "cannot determine current directory: gone");
        assert!(std::error::Error::source(&err).is_some());
    }
}

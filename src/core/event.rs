use std::sync::mpsc::Sender;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Log(String),
    Progress { percent: u8, status: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Transfer,
    Info,
    Warning,
    Error,
    Noise,
}

/// Sending half of the report channel. A dropped receiver only means nobody
/// is listening anymore.
#[derive(Debug, Clone)]
pub struct Reporter<'a> {
    tx: &'a Sender<PipelineEvent>,
}

impl<'a> Reporter<'a> {
    pub fn new(tx: &'a Sender<PipelineEvent>) -> Self {
        Self { tx }
    }

    pub fn log(&self, line: impl Into<String>) {
        let _ = self.tx.send(PipelineEvent::Log(line.into()));
    }

    pub fn progress(&self, percent: u8, status: impl Into<String>) {
        let _ = self.tx.send(PipelineEvent::Progress {
            percent,
            status: status.into(),
        });
    }
}

pub fn classify_log_line(line: &str) -> LogLevel {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LogLevel::Noise;
    }

    if trimmed.starts_with("ERROR:") {
        return LogLevel::Error;
    }
    if trimmed.starts_with("WARNING:") || trimmed.starts_with("Warning:") {
        return LogLevel::Warning;
    }

    if trimmed.starts_with("[download]") && trimmed.contains('%') {
        return LogLevel::Transfer;
    }
    if trimmed.contains("time=") && (trimmed.contains("speed=") || trimmed.contains("size=")) {
        return LogLevel::Transfer;
    }

    let lower = trimmed.to_ascii_lowercase();
    let noise_prefixes = [
        "[debug]",
        "[info] testing format",
        "deleting original file",
        "ffmpeg version",
        "built with",
        "configuration:",
        "libav",
        "libsw",
        "libpostproc",
    ];
    if noise_prefixes.iter().any(|prefix| lower.starts_with(prefix)) {
        return LogLevel::Noise;
    }

    if lower.contains("error") || lower.contains("no such file") || lower.contains("failed") {
        return LogLevel::Error;
    }
    if lower.contains("warning") || lower.contains("deprecated") {
        return LogLevel::Warning;
    }

    LogLevel::Info
}

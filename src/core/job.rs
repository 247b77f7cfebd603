use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::PipelineError;
use crate::core::time::{parse_timestamp, round_millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    /// Fixed name of the file the downloader writes into the working directory.
    pub fn working_file_name(self) -> &'static str {
        match self {
            MediaKind::Video => "input.mp4",
            MediaKind::Audio => "input_audio.mp3",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Full,
    Cut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub kind: MediaKind,
    pub mode: Mode,
    pub url: String,
    pub output_name: String,
    pub output_dir: PathBuf,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl JobRequest {
    pub fn destination(&self) -> PathBuf {
        destination(&self.output_dir, &self.output_name, self.kind)
    }

    /// Blank markers count as absent.
    pub fn start_marker(&self) -> Option<&str> {
        non_blank(self.start.as_deref())
    }

    pub fn end_marker(&self) -> Option<&str> {
        non_blank(self.end.as_deref())
    }
}

fn non_blank(marker: Option<&str>) -> Option<&str> {
    marker.map(str::trim).filter(|m| !m.is_empty())
}

pub fn sanitize_output_name(name: &str) -> String {
    if name.trim().is_empty() {
        "output".to_string()
    } else {
        name.to_string()
    }
}

pub fn destination(dir: &Path, name: &str, kind: MediaKind) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_output_name(name), kind.extension()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutRange {
    pub start: f64,
    /// `None` cuts through to the end of the input.
    pub duration: Option<f64>,
}

impl CutRange {
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, PipelineError> {
        let start_secs = match start {
            Some(marker) => round_millis(parse_timestamp(marker)?),
            None => 0.0,
        };

        let duration = match end {
            Some(marker) => {
                let end_secs = round_millis(parse_timestamp(marker)?);
                if end_secs <= start_secs {
                    return Err(PipelineError::InvalidTimeRange {
                        start: start.unwrap_or("0").to_string(),
                        end: marker.to_string(),
                    });
                }
                Some(end_secs - start_secs)
            }
            None => None,
        };

        Ok(Self {
            start: start_secs,
            duration,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Downloading,
    Moving,
    Cutting,
    Finalizing,
    Complete,
    Failed,
}

impl RunPhase {
    pub fn label(self) -> &'static str {
        match self {
            RunPhase::Idle => "Idle",
            RunPhase::Downloading => "Downloading",
            RunPhase::Moving => "Moving",
            RunPhase::Cutting => "Cutting",
            RunPhase::Finalizing => "Finalizing",
            RunPhase::Complete => "Complete",
            RunPhase::Failed => "Failed",
        }
    }
}

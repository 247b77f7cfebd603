use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::core::error::PipelineError;

/// Resolves the configured yt-dlp and ffmpeg, failing on the first one that
/// cannot be found.
pub fn check_dependencies(config: &Config) -> Result<Vec<PathBuf>, PipelineError> {
    [config.ytdlp.as_path(), config.ffmpeg.as_path()]
        .into_iter()
        .map(resolve_tool)
        .collect()
}

pub fn resolve_tool(program: &Path) -> Result<PathBuf, PipelineError> {
    which::which(program).map_err(|_| PipelineError::ToolNotFound {
        program: program.display().to_string(),
    })
}

use std::path::{Path, PathBuf};

use clap::Args;

/// Tool locations and directories shared by every run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
    /// Where the downloader drops the fixed-name working file.
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Launch directory; relative paths given by the user resolve against it.
    pub base_dir: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// yt-dlp executable
    #[arg(long, global = true, env = "YTCLIP_YTDLP", default_value = "yt-dlp")]
    pub ytdlp: PathBuf,
    /// ffmpeg executable
    #[arg(long, global = true, env = "YTCLIP_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,
    /// Directory for the intermediate download
    #[arg(long, global = true, env = "YTCLIP_WORK_DIR")]
    pub work_dir: Option<PathBuf>,
    /// Default directory for finished files
    #[arg(long, global = true, env = "YTCLIP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
    #[arg(long, global = true, default_value = "libx264")]
    pub video_codec: String,
    #[arg(long, global = true, default_value = "libmp3lame")]
    pub audio_codec: String,
}

impl Config {
    pub fn from_args(args: &ConfigArgs, cwd: &Path) -> Self {
        let absolute = |dir: &Option<PathBuf>| match dir {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => cwd.join(path),
            None => cwd.to_path_buf(),
        };

        Self {
            ytdlp: args.ytdlp.clone(),
            ffmpeg: args.ffmpeg.clone(),
            work_dir: absolute(&args.work_dir),
            output_dir: absolute(&args.output_dir),
            base_dir: cwd.to_path_buf(),
            video_codec: args.video_codec.clone(),
            audio_codec: args.audio_codec.clone(),
        }
    }

    #[cfg(test)]
    pub fn with_dirs(work_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            base_dir: work_dir.clone(),
            work_dir,
            output_dir: output_dir.into(),
            video_codec: "libx264".to_string(),
            audio_codec: "libmp3lame".to_string(),
        }
    }

    /// Resolves an output directory given by the user against this config.
    pub fn resolve_output_dir(&self, dir: Option<&Path>) -> PathBuf {
        match dir {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.base_dir.join(path),
            None => self.output_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(work_dir: Option<&str>, output_dir: Option<&str>) -> ConfigArgs {
        ConfigArgs {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("/opt/ffmpeg/bin/ffmpeg"),
            work_dir: work_dir.map(PathBuf::from),
            output_dir: output_dir.map(PathBuf::from),
            video_codec: "libx264".to_string(),
            audio_codec: "libmp3lame".to_string(),
        }
    }

    #[test]
    fn directories_default_to_cwd() {
        let config = Config::from_args(&args(None, None), Path::new("/home/me"));
        assert_eq!(config.work_dir, PathBuf::from("/home/me"));
        assert_eq!(config.output_dir, PathBuf::from("/home/me"));
        assert_eq!(config.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }

    #[test]
    fn relative_directories_become_absolute() {
        let config = Config::from_args(&args(Some("tmp"), Some("/srv/clips")), Path::new("/home/me"));
        assert_eq!(config.work_dir, PathBuf::from("/home/me/tmp"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/clips"));
    }

    #[test]
    fn resolves_user_output_dir() {
        let config = Config::from_args(&args(Some("/tmp/w"), Some("/out")), Path::new("/home/me"));
        assert_eq!(config.resolve_output_dir(None), PathBuf::from("/out"));
        assert_eq!(
            config.resolve_output_dir(Some(Path::new("music"))),
            PathBuf::from("/home/me/music")
        );
        assert_eq!(
            config.resolve_output_dir(Some(Path::new("/abs"))),
            PathBuf::from("/abs")
        );
    }
}

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, ConfigArgs};
use crate::core::deps::check_dependencies;
use crate::core::error::PipelineError;
use crate::core::formatter::format_event_line;
use crate::core::job::{JobRequest, MediaKind, Mode};
use crate::core::pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(
    name = "ytclip",
    version,
    about = "Download and trim online video/audio with yt-dlp and ffmpeg"
)]
pub struct SystemCli {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Without a subcommand the interactive terminal UI starts
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Grammar of the TUI input line.
#[derive(Debug, Parser)]
#[command(name = "ytclip", disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download a video (mp4), optionally cut to --start/--end
    Video(JobArgs),
    /// Download audio (mp3), optionally cut to --start/--end
    Audio(JobArgs),
    /// Check that yt-dlp and ffmpeg can be found
    Check,
}

#[derive(Debug, Clone, Args)]
pub struct JobArgs {
    /// Address of the video/audio page
    pub url: String,
    /// Output file name without extension ("output" when blank)
    #[arg(short = 'o', long = "output", default_value = "")]
    pub output_name: String,
    /// Output directory
    #[arg(short = 'd', long = "dir")]
    pub output_dir: Option<PathBuf>,
    /// Cut start, [[HH:]MM:]SS[.frac]
    #[arg(short = 's', long)]
    pub start: Option<String>,
    /// Cut end, [[HH:]MM:]SS[.frac]; omit to keep everything after --start
    #[arg(short = 'e', long)]
    pub end: Option<String>,
}

pub fn job_args_to_request(kind: MediaKind, args: JobArgs, config: &Config) -> JobRequest {
    let mode = if args.start.is_some() || args.end.is_some() {
        Mode::Cut
    } else {
        Mode::Full
    };

    JobRequest {
        kind,
        mode,
        url: args.url,
        output_name: args.output_name,
        output_dir: config.resolve_output_dir(args.output_dir.as_deref()),
        start: args.start,
        end: args.end,
    }
}

pub fn parse_line(line: &str) -> Result<Commands, String> {
    let mut argv = Vec::new();
    argv.push("ytclip".to_string());

    let tokens = shell_words::split(line).map_err(|err| err.to_string())?;
    argv.extend(tokens);

    let parsed = Cli::try_parse_from(argv).map_err(|err| err.to_string())?;
    Ok(parsed.command)
}

/// Runs one command without the TUI, printing events as they arrive.
pub fn execute(command: Commands, config: Config) -> Result<(), PipelineError> {
    let (kind, args) = match command {
        Commands::Check => {
            for path in check_dependencies(&config)? {
                println!("found {}", path.display());
            }
            return Ok(());
        }
        Commands::Video(args) => (MediaKind::Video, args),
        Commands::Audio(args) => (MediaKind::Audio, args),
    };

    let request = job_args_to_request(kind, args, &config);
    let pipeline = Pipeline::new(config);
    let (event_tx, event_rx) = mpsc::channel();

    let worker = thread::spawn(move || pipeline.run(&request, &event_tx));

    for event in event_rx {
        println!("{}", format_event_line(&event));
    }

    let output = worker
        .join()
        .map_err(|_| PipelineError::ProcessingError {
            message: "worker thread panicked".to_string(),
        })??;
    println!("Saved {}", output.display());
    Ok(())
}

pub const HELP_LINES: [&str; 9] = [
    "Commands:",
    "  video <url> [-o name] [-d dir] [--start T] [--end T]",
    "  audio <url> [-o name] [-d dir] [--start T] [--end T]",
    "  check            verify yt-dlp and ffmpeg are installed",
    "  open             show the last output file",
    "  cancel           stop the running job after its current step",
    "  clear / exit",
    "Times: SS, MM:SS or HH:MM:SS, fraction with '.' or ','",
    "Keys: PgUp/PgDn/Up/Down scroll, Esc quits",
];

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn parses_cut_line_with_quoted_url() {
        let line = "video 'https://example.com/watch?v=1&t=2' -o clip --start 0:10 --end 0:40";
        let Commands::Video(args) = parse_line(line).unwrap() else {
            panic!("expected video command");
        };
        assert_eq!(args.url, "https://example.com/watch?v=1&t=2");
        assert_eq!(args.output_name, "clip");
        assert_eq!(args.start.as_deref(), Some("0:10"));
        assert_eq!(args.end.as_deref(), Some("0:40"));

        let config = Config::with_dirs("/work", "/out");
        let request = job_args_to_request(MediaKind::Video, args, &config);
        assert_eq!(request.mode, Mode::Cut);
        assert_eq!(request.output_dir, PathBuf::from("/out"));
    }

    #[test]
    fn no_markers_means_full_mode() {
        let Commands::Audio(args) = parse_line("audio https://x.test/a -d music").unwrap() else {
            panic!("expected audio command");
        };
        let mut config = Config::with_dirs("/work", "/out");
        config.base_dir = PathBuf::from("/home/me");
        let request = job_args_to_request(MediaKind::Audio, args, &config);
        assert_eq!(request.mode, Mode::Full);
        assert_eq!(request.output_name, "");
        assert_eq!(request.destination(), Path::new("/home/me/music/output.mp3"));
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(parse_line("encode -i a.mp4").is_err());
        assert!(parse_line("video").is_err());
        assert!(parse_line("video 'unterminated").is_err());
    }

    #[test]
    fn system_cli_accepts_global_config() {
        let cli = SystemCli::try_parse_from([
            "ytclip",
            "--ffmpeg",
            "/opt/ffmpeg",
            "check",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Check)));
        assert_eq!(cli.config.ffmpeg, PathBuf::from("/opt/ffmpeg"));

        let cli = SystemCli::try_parse_from(["ytclip"]).unwrap();
        assert!(cli.command.is_none());
    }
}

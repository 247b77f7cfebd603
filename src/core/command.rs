use std::path::PathBuf;

use crate::core::job::{CutRange, MediaKind};
use crate::core::time::format_seconds;

/// yt-dlp invocation fetching a single resource into the working file.
#[derive(Debug, Clone)]
pub struct DownloadCommand {
    pub url: String,
    pub kind: MediaKind,
    pub output: PathBuf,
}

impl DownloadCommand {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.url.clone(), "--no-playlist".to_string()];

        match self.kind {
            MediaKind::Video => {
                args.push("--merge-output-format".to_string());
                args.push("mp4".to_string());
            }
            MediaKind::Audio => {
                args.push("--extract-audio".to_string());
                args.push("--audio-format".to_string());
                args.push("mp3".to_string());
            }
        }

        args.push("-o".to_string());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// ffmpeg invocation extracting `range` from the working file.
#[derive(Debug, Clone)]
pub struct CutCommand {
    pub input: PathBuf,
    pub output: PathBuf,
    pub kind: MediaKind,
    pub range: CutRange,
    pub video_codec: String,
    pub audio_codec: String,
}

impl CutCommand {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-stats".to_string(),
            "-ss".to_string(),
            format_seconds(self.range.start),
        ];

        if let Some(duration) = self.range.duration {
            args.push("-t".to_string());
            args.push(format_seconds(duration));
        }

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.push("-y".to_string());

        match self.kind {
            MediaKind::Video => {
                args.push("-c:v".to_string());
                args.push(self.video_codec.clone());
            }
            MediaKind::Audio => {
                args.push("-vn".to_string());
                args.push("-acodec".to_string());
                args.push(self.audio_codec.clone());
            }
        }

        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Display form of an invocation, quoted so it can be pasted into a shell.
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(program);
    words.extend(args.iter().map(String::as_str));
    shell_words::join(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut(kind: MediaKind, range: CutRange) -> CutCommand {
        CutCommand {
            input: PathBuf::from("/work/input.mp4"),
            output: PathBuf::from("/out/my clip.mp4"),
            kind,
            range,
            video_codec: "libx264".to_string(),
            audio_codec: "libmp3lame".to_string(),
        }
    }

    #[test]
    fn video_download_merges_to_mp4() {
        let cmd = DownloadCommand {
            url: "https://example.com/watch?v=1&list=2".to_string(),
            kind: MediaKind::Video,
            output: PathBuf::from("/work/input.mp4"),
        };
        assert_eq!(
            cmd.to_args(),
            vec![
                "https://example.com/watch?v=1&list=2",
                "--no-playlist",
                "--merge-output-format",
                "mp4",
                "-o",
                "/work/input.mp4",
            ]
        );
    }

    #[test]
    fn audio_download_extracts_mp3() {
        let cmd = DownloadCommand {
            url: "u".to_string(),
            kind: MediaKind::Audio,
            output: PathBuf::from("input_audio.mp3"),
        };
        let args = cmd.to_args();
        assert!(args.contains(&"--extract-audio".to_string()));
        assert_eq!(args[args.len() - 3..], ["mp3", "-o", "input_audio.mp3"]);
    }

    #[test]
    fn bounded_video_cut() {
        let args = cut(
            MediaKind::Video,
            CutRange {
                start: 10.0,
                duration: Some(30.0),
            },
        )
        .to_args();
        assert_eq!(
            args,
            vec![
                "-v",
                "quiet",
                "-stats",
                "-ss",
                "10",
                "-t",
                "30",
                "-i",
                "/work/input.mp4",
                "-y",
                "-c:v",
                "libx264",
                "/out/my clip.mp4",
            ]
        );
    }

    #[test]
    fn open_ended_audio_cut_has_no_duration() {
        let args = cut(
            MediaKind::Audio,
            CutRange {
                start: 1.5,
                duration: None,
            },
        )
        .to_args();
        assert!(!args.contains(&"-t".to_string()));
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-acodec" && w[1] == "libmp3lame"));
        assert!(args.windows(2).any(|w| w[0] == "-ss" && w[1] == "1.5"));
    }

    #[test]
    fn display_quotes_spaces() {
        let shown = display_command("ffmpeg", &["-i".to_string(), "a b.mp4".to_string()]);
        assert_eq!(shown, "ffmpeg -i 'a b.mp4'");
    }
}

use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::core::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub success: bool,
    pub code: Option<i32>,
}

/// Runs an external tool to completion, handing each output line (stdout and
/// stderr merged) to `on_line` as soon as it is read.
pub trait ProcessRunner: Send + Sync {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        cwd: &Path,
        on_line: &mut dyn FnMut(String),
    ) -> Result<ExitInfo, PipelineError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        cwd: &Path,
        on_line: &mut dyn FnMut(String),
    ) -> Result<ExitInfo, PipelineError> {
        let program_name = program.display().to_string();
        if !cwd.is_dir() {
            return Err(PipelineError::ProcessFailed {
                program: program_name,
                message: format!("working directory {} does not exist", cwd.display()),
            });
        }

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::ToolNotFound {
                    program: program_name.clone(),
                }
            } else {
                PipelineError::ProcessFailed {
                    program: program_name.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let (line_tx, line_rx) = mpsc::channel::<String>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, line_tx.clone()));
        }
        drop(line_tx);

        for line in line_rx {
            on_line(line);
        }

        for handle in readers {
            let _ = handle.join();
        }

        let status = child.wait().map_err(|e| PipelineError::ProcessFailed {
            program: program_name,
            message: e.to_string(),
        })?;

        Ok(ExitInfo {
            success: status.success(),
            code: status.code(),
        })
    }
}

/// Splits on both `\r` and `\n`: yt-dlp and ffmpeg redraw their progress line
/// with carriage returns.
fn spawn_line_reader<R: Read + Send + 'static>(
    reader: R,
    sender: Sender<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut line_buf: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };

            for &byte in &chunk[..read] {
                match byte {
                    b'\r' | b'\n' => flush_line(&mut line_buf, &sender),
                    other => line_buf.push(other),
                }
            }
        }

        flush_line(&mut line_buf, &sender);
    })
}

fn flush_line(line_buf: &mut Vec<u8>, sender: &Sender<String>) {
    if line_buf.is_empty() {
        return;
    }
    let line = String::from_utf8_lossy(line_buf).trim_end().to_string();
    line_buf.clear();
    if !line.is_empty() {
        let _ = sender.send(line);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn lines_of(input: &[u8]) -> Vec<String> {
        let (tx, rx) = mpsc::channel();
        spawn_line_reader(Cursor::new(input.to_vec()), tx)
            .join()
            .unwrap();
        rx.iter().collect()
    }

    #[test]
    fn splits_on_carriage_returns_and_newlines() {
        let lines = lines_of(b"[download]  10.0%\r[download]  55.0%\r\nDone\n\ntrailing");
        assert_eq!(
            lines,
            vec!["[download]  10.0%", "[download]  55.0%", "Done", "trailing"]
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let lines = lines_of(b"caf\xff\n");
        assert_eq!(lines, vec!["caf\u{fffd}"]);
    }

    #[test]
    fn missing_program_is_tool_not_found() {
        let cwd = std::env::temp_dir();
        let err = SystemProcessRunner
            .run(
                Path::new("ytclip-definitely-missing-tool"),
                &[],
                &cwd,
                &mut |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn merges_output_and_reports_exit_code() {
        let cwd = tempfile::TempDir::new().unwrap();
        let args = vec![
            "-c".to_string(),
            r#"printf "a\r"; echo b >&2; exit 3"#.to_string(),
        ];
        let mut lines = Vec::new();
        let exit = SystemProcessRunner
            .run(Path::new("sh"), &args, cwd.path(), &mut |line| lines.push(line))
            .unwrap();

        lines.sort();
        assert_eq!(lines, vec!["a", "b"]);
        assert!(!exit.success);
        assert_eq!(exit.code, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_the_given_directory() {
        let cwd = tempfile::TempDir::new().unwrap();
        std::fs::write(cwd.path().join("marker.txt"), b"x").unwrap();
        let args = vec!["-c".to_string(), "ls".to_string()];
        let mut lines = Vec::new();
        let exit = SystemProcessRunner
            .run(Path::new("sh"), &args, cwd.path(), &mut |line| lines.push(line))
            .unwrap();

        assert!(exit.success);
        assert_eq!(exit.code, Some(0));
        assert_eq!(lines, vec!["marker.txt"]);
    }

    #[test]
    fn missing_working_directory_is_process_failure() {
        let cwd = tempfile::TempDir::new().unwrap();
        let missing = cwd.path().join("gone");
        let err = SystemProcessRunner
            .run(Path::new("sh"), &[], &missing, &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, PipelineError::ProcessFailed { .. }));
    }
}

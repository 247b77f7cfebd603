use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, TryLockError};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::command::{display_command, CutCommand, DownloadCommand};
use crate::core::error::PipelineError;
use crate::core::event::{PipelineEvent, Reporter};
use crate::core::fs::{FileSystem, StdFileSystem};
use crate::core::job::{CutRange, JobRequest, Mode, RunPhase};
use crate::core::process::{ExitInfo, ProcessRunner, SystemProcessRunner};
use crate::core::progress::ProgressState;

const STATUS_DOWNLOAD_FAILED: &str = "Download failed";
const STATUS_PROCESSING_FAILED: &str = "Error during processing";

/// Cooperative cancellation, honoured between steps. A running child process
/// is never killed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Download-and-cut runner. Only one run may be active at a time; a second
/// caller gets [`PipelineError::Busy`].
pub struct Pipeline<P = SystemProcessRunner, F = StdFileSystem> {
    config: Config,
    process: P,
    fs: F,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self::with_adapters(config, SystemProcessRunner, StdFileSystem)
    }
}

impl<P: ProcessRunner, F: FileSystem> Pipeline<P, F> {
    pub fn with_adapters(config: Config, process: P, fs: F) -> Self {
        Self {
            config,
            process,
            fs,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(
        &self,
        request: &JobRequest,
        events: &Sender<PipelineEvent>,
    ) -> Result<PathBuf, PipelineError> {
        self.run_with_cancel(request, events, &CancelToken::new())
    }

    pub fn run_with_cancel(
        &self,
        request: &JobRequest,
        events: &Sender<PipelineEvent>,
        cancel: &CancelToken,
    ) -> Result<PathBuf, PipelineError> {
        let _guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(PipelineError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        info!(
            kind = %request.kind,
            mode = ?request.mode,
            url = %request.url,
            "starting run"
        );

        let mut run = Run {
            pipeline: self,
            request,
            reporter: Reporter::new(events),
            cancel,
            progress: ProgressState::default(),
            phase: RunPhase::Idle,
        };
        let result = run.execute();

        match &result {
            Ok(path) => info!(output = %path.display(), "run complete"),
            Err(err) => warn!(phase = run.phase.label(), error = %err, "run failed"),
        }
        result
    }
}

struct Run<'a, P, F> {
    pipeline: &'a Pipeline<P, F>,
    request: &'a JobRequest,
    reporter: Reporter<'a>,
    cancel: &'a CancelToken,
    progress: ProgressState,
    phase: RunPhase,
}

impl<'a, P: ProcessRunner, F: FileSystem> Run<'a, P, F> {
    fn execute(&mut self) -> Result<PathBuf, PipelineError> {
        self.progress.reset();
        self.reporter
            .progress(self.progress.percent(), self.progress.status());

        let range = match self.request.mode {
            Mode::Full => None,
            Mode::Cut => {
                let parsed =
                    CutRange::parse(self.request.start_marker(), self.request.end_marker());
                match parsed {
                    Ok(range) => Some(range),
                    Err(err) => {
                        let line = format!("Invalid time range: {err}");
                        return Err(self.fail("Invalid time range", line, err));
                    }
                }
            }
        };

        self.check_cancel()?;
        let working = self.download()?;
        self.check_cancel()?;

        let destination = self.request.destination();
        match range {
            None => self.place(&working, &destination)?,
            Some(range) => self.cut(&working, &destination, range)?,
        }

        self.phase = RunPhase::Finalizing;
        self.advance(100, "Process complete.");
        self.phase = RunPhase::Complete;
        Ok(destination)
    }

    fn download(&mut self) -> Result<PathBuf, PipelineError> {
        let pipeline = self.pipeline;
        let config = &pipeline.config;
        let kind = self.request.kind;

        self.phase = RunPhase::Downloading;
        self.advance(0, format!("Downloading {kind}... 0%"));
        let purpose = match self.request.mode {
            Mode::Full => format!("full {kind}"),
            Mode::Cut => format!("{kind} cutting"),
        };
        self.reporter
            .log(format!("Starting yt-dlp download for {purpose}..."));

        let working = config.work_dir.join(kind.working_file_name());
        self.clear_stale_working_file(&working)?;
        let command = DownloadCommand {
            url: self.request.url.clone(),
            kind,
            output: working.clone(),
        };

        match self.invoke(&config.ytdlp, &command.to_args()) {
            Ok(exit) if !exit.success => {
                self.reporter
                    .log(format!("yt-dlp exited with {}", describe_exit(exit)));
            }
            Ok(_) => {}
            Err(err) => {
                let line = format!("{} download failed: {err}", kind.title());
                return Err(self.fail(STATUS_DOWNLOAD_FAILED, line, err));
            }
        }

        if !self.pipeline.fs.exists(&working) {
            let line = format!("{} download failed.", kind.title());
            let err = PipelineError::DownloadMissing { path: working };
            return Err(self.fail(STATUS_DOWNLOAD_FAILED, line, err));
        }

        self.advance(60, format!("{} download complete.", kind.title()));
        self.reporter
            .log(format!("{} downloaded successfully.", kind.title()));
        Ok(working)
    }

    fn place(&mut self, working: &Path, destination: &Path) -> Result<(), PipelineError> {
        let kind = self.request.kind;

        self.phase = RunPhase::Moving;
        self.set_status(format!("Processing {kind}... 60%"));
        self.reporter
            .log(format!("Moving downloaded {kind} to output location..."));

        if let Err(err) = self.pipeline.fs.move_file(working, destination) {
            let line = format!("Error during processing: {err}");
            let err = PipelineError::ProcessingError {
                message: format!(
                    "could not move {} to {}: {err}",
                    working.display(),
                    destination.display()
                ),
            };
            return Err(self.fail(STATUS_PROCESSING_FAILED, line, err));
        }

        self.advance(95, format!("{} processing complete.", kind.title()));
        self.reporter.log(format!(
            "{} saved successfully at: {}",
            kind.title(),
            destination.display()
        ));
        Ok(())
    }

    fn cut(
        &mut self,
        working: &Path,
        destination: &Path,
        range: CutRange,
    ) -> Result<(), PipelineError> {
        let pipeline = self.pipeline;
        let config = &pipeline.config;
        let kind = self.request.kind;

        self.phase = RunPhase::Cutting;
        let from = self.request.start_marker().unwrap_or("0:00");
        match self.request.end_marker() {
            Some(to) => self
                .reporter
                .log(format!("Cutting {kind} from {from} to {to}...")),
            None => self
                .reporter
                .log(format!("Cutting {kind} from {from} until end...")),
        }
        self.set_status(format!("Cutting {kind}... 60%"));

        let command = CutCommand {
            input: working.to_path_buf(),
            output: destination.to_path_buf(),
            kind,
            range,
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        };

        let failure = match self.invoke(&config.ffmpeg, &command.to_args()) {
            Err(err) => Some(err),
            Ok(exit) if !exit.success => Some(PipelineError::ProcessingError {
                message: format!("ffmpeg exited with {}", describe_exit(exit)),
            }),
            Ok(_) if !self.pipeline.fs.exists(destination) => {
                Some(PipelineError::ProcessingError {
                    message: format!("ffmpeg did not produce {}", destination.display()),
                })
            }
            Ok(_) => None,
        };
        if let Some(err) = failure {
            let line = format!("Error during processing: {err}");
            return Err(self.fail(STATUS_PROCESSING_FAILED, line, err));
        }

        self.advance(95, format!("{} cutting complete.", kind.title()));
        self.reporter.log(format!(
            "{} cut and saved successfully at: {}",
            kind.title(),
            destination.display()
        ));

        self.phase = RunPhase::Finalizing;
        if let Err(err) = self.pipeline.fs.remove_file(working) {
            warn!(path = %working.display(), error = %err, "could not remove working file");
            self.reporter.log(format!(
                "Warning: could not remove working file {}: {err}",
                working.display()
            ));
        }
        Ok(())
    }

    /// A leftover working file from an earlier run would pass the existence
    /// check below and make yt-dlp skip the download.
    fn clear_stale_working_file(&mut self, working: &Path) -> Result<(), PipelineError> {
        if !self.pipeline.fs.exists(working) {
            return Ok(());
        }
        debug!(path = %working.display(), "removing stale working file");
        match self.pipeline.fs.remove_file(working) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                let line = format!(
                    "Could not remove stale working file {}: {err}",
                    working.display()
                );
                let err = PipelineError::ProcessFailed {
                    program: self.pipeline.config.ytdlp.display().to_string(),
                    message: format!("stale working file {} is in the way: {err}", working.display()),
                };
                Err(self.fail(STATUS_DOWNLOAD_FAILED, line, err))
            }
        }
    }

    fn invoke(&self, program: &Path, args: &[String]) -> Result<ExitInfo, PipelineError> {
        let shown = display_command(&program.to_string_lossy(), args);
        debug!(command = %shown, "spawning");
        self.reporter.log(format!("Executing: {shown}"));

        let reporter = &self.reporter;
        let mut forward = |line: String| reporter.log(line);
        self.pipeline
            .process
            .run(program, args, &self.pipeline.config.work_dir, &mut forward)
    }

    fn check_cancel(&mut self) -> Result<(), PipelineError> {
        if !self.cancel.is_cancelled() {
            return Ok(());
        }
        Err(self.fail("Cancelled", "Job cancelled.".to_string(), PipelineError::Cancelled))
    }

    fn advance(&mut self, percent: u8, status: impl Into<String>) {
        let percent = self.progress.advance(percent, status);
        self.reporter.progress(percent, self.progress.status());
    }

    fn set_status(&mut self, status: impl Into<String>) {
        let percent = self.progress.set_status(status);
        self.reporter.progress(percent, self.progress.status());
    }

    /// Reports a failed step and hands the error back for propagation.
    fn fail(&mut self, status: &str, line: String, err: PipelineError) -> PipelineError {
        self.phase = RunPhase::Failed;
        self.reporter.log(line);
        self.set_status(status);
        err
    }
}

fn describe_exit(exit: ExitInfo) -> String {
    match exit.code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

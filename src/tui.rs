use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;

use crate::cli::{self, Commands};
use crate::config::Config;
use crate::core::deps::check_dependencies;
use crate::core::error::PipelineError;
use crate::core::event::{classify_log_line, LogLevel, PipelineEvent};
use crate::core::formatter::{format_percent_bar, format_transfer_line};
use crate::core::job::MediaKind;
use crate::core::pipeline::{CancelToken, Pipeline};
use crate::core::progress::parse_transfer_line;

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, PipelineError> {
        enable_raw_mode().map_err(PipelineError::terminal)?;
        let mut stdout = io::stdout();
        stdout
            .execute(EnterAlternateScreen)
            .map_err(PipelineError::terminal)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = stdout.execute(LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct HistoryLine {
    level: LogLevel,
    text: String,
}

type JobResult = Result<PathBuf, PipelineError>;

struct AppState {
    input: String,
    history: Vec<HistoryLine>,
    percent: Option<u8>,
    status: String,
    transfer: Option<String>,
    transfer_counter: u64,
    last_output: Option<PathBuf>,
    cancel: Option<CancelToken>,
    should_quit: bool,
    job_running: bool,
    scroll_offset: usize,
    view_lines: usize,
}

const DIVIDER_MARKER: &str = "<divider>";
const TRANSFER_LOG_EVERY: u64 = 25;

impl AppState {
    fn new() -> Self {
        let mut app = Self {
            input: String::new(),
            history: Vec::new(),
            percent: None,
            status: "Ready".to_string(),
            transfer: None,
            transfer_counter: 0,
            last_output: None,
            cancel: None,
            should_quit: false,
            job_running: false,
            scroll_offset: 0,
            view_lines: 1,
        };
        app.push_info("Welcome to ytclip. Type 'help' for commands.");
        app
    }

    fn push_history(&mut self, level: LogLevel, line: impl Into<String>) {
        const MAX_LINES: usize = 500;
        if self.history.len() >= MAX_LINES {
            let drain_count = self.history.len().saturating_sub(MAX_LINES - 1);
            self.history.drain(0..drain_count);
        }
        self.history.push(HistoryLine {
            level,
            text: line.into(),
        });
        self.clamp_scroll();
    }

    fn push_info(&mut self, line: impl Into<String>) {
        self.push_history(LogLevel::Info, line);
    }

    fn push_error(&mut self, line: impl Into<String>) {
        self.push_history(LogLevel::Error, line);
    }

    fn apply_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Progress { percent, status } => {
                self.percent = Some(percent);
                self.status = status;
            }
            PipelineEvent::Log(line) => match classify_log_line(&line) {
                LogLevel::Transfer => {
                    if let Some(update) = parse_transfer_line(&line) {
                        self.transfer = Some(format_transfer_line(&update));
                    }
                    self.transfer_counter = self.transfer_counter.wrapping_add(1);
                    if self.transfer_counter % TRANSFER_LOG_EVERY == 0 {
                        self.push_history(LogLevel::Transfer, line);
                    }
                }
                LogLevel::Noise => {}
                level => self.push_history(level, line),
            },
        }
    }

    fn finish_job(&mut self, result: JobResult) {
        self.job_running = false;
        self.cancel = None;
        self.transfer = None;
        match result {
            Ok(path) => {
                self.push_info(format!("Job finished: {}", path.display()));
                self.last_output = Some(path);
            }
            Err(err) => self.push_error(format!("Job failed: {err}")),
        }
    }

    fn set_view_lines(&mut self, lines: usize) {
        self.view_lines = lines.max(1);
        self.clamp_scroll();
    }

    fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.max_scroll();
        self.scroll_offset = (self.scroll_offset + lines).min(max_scroll);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    fn scroll_top(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    fn scroll_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    fn max_scroll(&self) -> usize {
        self.history.len().saturating_sub(self.view_lines)
    }

    fn clamp_scroll(&mut self) {
        let max_scroll = self.max_scroll();
        if self.scroll_offset > max_scroll {
            self.scroll_offset = max_scroll;
        }
    }
}

pub fn run(config: Config) -> Result<(), PipelineError> {
    let mut app = AppState::new();
    match check_dependencies(&config) {
        Ok(_) => app.push_info("yt-dlp and ffmpeg found."),
        Err(err) => app.push_error(format!("warning: {err}")),
    }

    let pipeline = Arc::new(Pipeline::new(config));

    let _guard = TerminalGuard::enter()?;
    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(PipelineError::terminal)?;

    let (event_tx, event_rx) = mpsc::channel::<PipelineEvent>();
    let (job_tx, job_rx) = mpsc::channel::<JobResult>();

    loop {
        while let Ok(event) = event_rx.try_recv() {
            app.apply_event(event);
        }

        while let Ok(result) = job_rx.try_recv() {
            app.finish_job(result);
        }

        let size = terminal.size().map_err(PipelineError::terminal)?;
        let history_height = size.height.saturating_sub(7).max(3) as usize;
        let view_lines = history_height.saturating_sub(2).max(1);
        app.set_view_lines(view_lines);

        terminal
            .draw(|frame| {
                let layout = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(4),
                        Constraint::Min(3),
                        Constraint::Length(3),
                    ])
                    .split(frame.size());

                let header = render_header(&app, layout[0].width as usize);
                frame.render_widget(header, layout[0]);

                let history = render_history(&app, layout[1].height as usize, layout[1].width as usize);
                frame.render_widget(history, layout[1]);

                let input = Paragraph::new(app.input.as_str())
                    .block(Block::default().title("Input").borders(Borders::ALL))
                    .wrap(Wrap { trim: false });
                frame.render_widget(input, layout[2]);
                frame.set_cursor(
                    layout[2].x + 1 + app.input.len() as u16,
                    layout[2].y + 1,
                );
            })
            .map_err(PipelineError::terminal)?;

        if event::poll(Duration::from_millis(50)).map_err(PipelineError::terminal)? {
            if let Event::Key(key) = event::read().map_err(PipelineError::terminal)? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.should_quit = true;
                    }
                    KeyCode::Char(ch) => {
                        app.input.push(ch);
                    }
                    KeyCode::Backspace => {
                        app.input.pop();
                    }
                    KeyCode::Enter => {
                        let line = app.input.trim().to_string();
                        app.input.clear();
                        if !line.is_empty() {
                            handle_line(&mut app, &line, &pipeline, &event_tx, &job_tx);
                        }
                    }
                    KeyCode::PageUp => {
                        let step = app.view_lines.saturating_sub(1).max(1);
                        app.scroll_up(step);
                    }
                    KeyCode::PageDown => {
                        let step = app.view_lines.saturating_sub(1).max(1);
                        app.scroll_down(step);
                    }
                    KeyCode::Up => {
                        app.scroll_up(1);
                    }
                    KeyCode::Down => {
                        app.scroll_down(1);
                    }
                    KeyCode::Home => {
                        app.scroll_top();
                    }
                    KeyCode::End => {
                        app.scroll_bottom();
                    }
                    KeyCode::Esc => {
                        app.should_quit = true;
                    }
                    _ => {}
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_line(
    app: &mut AppState,
    line: &str,
    pipeline: &Arc<Pipeline>,
    event_tx: &mpsc::Sender<PipelineEvent>,
    job_tx: &mpsc::Sender<JobResult>,
) {
    let trimmed = line.trim();
    if !app.history.is_empty() {
        app.push_info(DIVIDER_MARKER);
    }
    app.push_info(format!(">> {trimmed}"));

    if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
        app.should_quit = true;
        return;
    }

    if trimmed.eq_ignore_ascii_case("clear") {
        app.history.clear();
        app.scroll_bottom();
        return;
    }

    if trimmed.eq_ignore_ascii_case("help") {
        for help in cli::HELP_LINES {
            app.push_info(help);
        }
        return;
    }

    if trimmed.eq_ignore_ascii_case("open") {
        match app.last_output.clone() {
            Some(path) => app.push_info(format!("Last output: {}", path.display())),
            None => app.push_info("No output yet."),
        }
        return;
    }

    if trimmed.eq_ignore_ascii_case("cancel") {
        match &app.cancel {
            Some(token) => {
                token.cancel();
                app.push_info("Cancelling after the current step...");
            }
            None => app.push_info("No job is running."),
        }
        return;
    }

    let (kind, args) = match cli::parse_line(trimmed) {
        Ok(Commands::Video(args)) => (MediaKind::Video, args),
        Ok(Commands::Audio(args)) => (MediaKind::Audio, args),
        Ok(Commands::Check) => {
            match check_dependencies(pipeline.config()) {
                Ok(paths) => {
                    for path in paths {
                        app.push_info(format!("found {}", path.display()));
                    }
                }
                Err(err) => app.push_error(format!("error: {err}")),
            }
            return;
        }
        Err(err) => {
            for err_line in err.lines().filter(|l| !l.trim().is_empty()) {
                app.push_error(err_line.to_string());
            }
            return;
        }
    };

    if app.job_running {
        app.push_error("A job is already running. Please wait for it to finish.");
        return;
    }

    let request = cli::job_args_to_request(kind, args, pipeline.config());
    let cancel = CancelToken::new();
    app.job_running = true;
    app.percent = Some(0);
    app.status = "Starting...".to_string();
    app.transfer = None;
    app.transfer_counter = 0;
    app.cancel = Some(cancel.clone());

    let pipeline = Arc::clone(pipeline);
    let event_tx = event_tx.clone();
    let job_tx = job_tx.clone();
    std::thread::spawn(move || {
        let result = pipeline.run_with_cancel(&request, &event_tx, &cancel);
        let _ = job_tx.send(result);
    });
}

fn render_header(app: &AppState, width: usize) -> Paragraph<'static> {
    let state = if app.job_running { "Running" } else { "Idle" };
    let bar_width = width.saturating_sub(30).clamp(10, 40);
    let bar = format_percent_bar(app.percent.unwrap_or(0), bar_width);
    let percent = app
        .percent
        .map(|p| format!("{p:>3}%"))
        .unwrap_or_else(|| "  -%".to_string());
    let transfer = app.transfer.clone().unwrap_or_default();

    let text = vec![
        Line::from(vec![
            Span::raw(format!("{state}: ")),
            Span::raw(app.status.clone()),
        ]),
        Line::from(vec![
            Span::raw(bar),
            Span::raw(" "),
            Span::raw(percent),
            Span::raw("  "),
            Span::styled(transfer, Style::default().fg(Color::DarkGray)),
        ]),
    ];

    Paragraph::new(text)
        .block(Block::default().title("ytclip").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn render_history(app: &AppState, height: usize, width: usize) -> Paragraph<'static> {
    let max_lines = height.saturating_sub(2).max(1);
    let end = app.history.len().saturating_sub(app.scroll_offset);
    let start = end.saturating_sub(max_lines);
    let divider_width = width.saturating_sub(2).max(1);
    let divider = "─".repeat(divider_width);
    let lines: Vec<Line> = app.history[start..end]
        .iter()
        .map(|line| {
            if line.text == DIVIDER_MARKER {
                Line::from(Span::raw(divider.clone()))
            } else {
                Line::from(Span::styled(line.text.clone(), level_style(line.level)))
            }
        })
        .collect();

    Paragraph::new(lines)
        .block(Block::default().title("Session").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
}

fn level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Error => Style::default().fg(Color::Red),
        LogLevel::Warning => Style::default().fg(Color::Yellow),
        LogLevel::Transfer | LogLevel::Noise => Style::default().fg(Color::DarkGray),
        LogLevel::Info => Style::default(),
    }
}

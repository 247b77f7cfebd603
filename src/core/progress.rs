use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

/// Percent plus status line for the run in progress. The percent never moves
/// backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    percent: u8,
    status: String,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            percent: 0,
            status: "Starting...".to_string(),
        }
    }
}

impl ProgressState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the percent actually recorded, clamped to `[current, 100]`.
    pub fn advance(&mut self, percent: u8, status: impl Into<String>) -> u8 {
        self.percent = percent.min(100).max(self.percent);
        self.status = status.into();
        self.percent
    }

    /// Updates the status text without touching the percent.
    pub fn set_status(&mut self, status: impl Into<String>) -> u8 {
        self.status = status.into();
        self.percent
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

/// Informational transfer figures scraped from tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferUpdate {
    Download {
        percent: f32,
        total: Option<String>,
        speed: Option<String>,
        eta: Option<String>,
    },
    Encode {
        time: Duration,
        speed: Option<f32>,
    },
}

static RE_YTDLP_DOWNLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[download\]\s+([0-9]*\.?[0-9]+)%(?:\s+of\s+~?\s*([0-9.]+\s*[KMGT]?i?B))?(?:\s+at\s+(\S+))?(?:\s+ETA\s+(\S+))?",
    )
    .unwrap()
});
static RE_FFMPEG_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time=\s*(-?[0-9]+:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?)").unwrap());
static RE_FFMPEG_SPEED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"speed=\s*([0-9]*\.?[0-9]+)x").unwrap());

pub fn parse_transfer_line(line: &str) -> Option<TransferUpdate> {
    let trimmed = line.trim();

    if let Some(cap) = RE_YTDLP_DOWNLOAD.captures(trimmed) {
        let percent = cap.get(1)?.as_str().parse::<f32>().ok()?;
        let text = |idx: usize| {
            cap.get(idx)
                .map(|m| m.as_str().to_string())
                .filter(|s| s != "Unknown")
        };
        return Some(TransferUpdate::Download {
            percent: percent.clamp(0.0, 100.0),
            total: text(2),
            speed: text(3),
            eta: text(4),
        });
    }

    let time = RE_FFMPEG_TIME
        .captures(trimmed)
        .and_then(|cap| cap.get(1))
        .and_then(|m| parse_ffmpeg_time(m.as_str()))?;
    let speed = RE_FFMPEG_SPEED
        .captures(trimmed)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok());
    Some(TransferUpdate::Encode { time, speed })
}

/// `HH:MM:SS[.frac]` as printed by ffmpeg. Negative times (seen before the
/// first packet) map to zero.
pub fn parse_ffmpeg_time(value: &str) -> Option<Duration> {
    if value.starts_with('-') {
        return Some(Duration::ZERO);
    }
    let mut parts = value.split(':');
    let hours = parts.next()?.parse::<u64>().ok()?;
    let minutes = parts.next()?.parse::<u64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() || seconds < 0.0 {
        return None;
    }
    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Duration::try_from_secs_f64(whole as f64 + seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_never_moves_backwards() {
        let mut state = ProgressState::default();
        assert_eq!(state.advance(60, "half"), 60);
        assert_eq!(state.advance(10, "oops"), 60);
        assert_eq!(state.status(), "oops");
        assert_eq!(state.advance(250, "done"), 100);
        state.reset();
        assert_eq!(state.percent(), 0);
        assert_eq!(state.status(), "Starting...");
    }

    #[test]
    fn parses_ytdlp_download_line() {
        let update =
            parse_transfer_line("[download]  45.3% of ~ 12.00MiB at  1.20MiB/s ETA 00:05").unwrap();
        assert_eq!(
            update,
            TransferUpdate::Download {
                percent: 45.3,
                total: Some("12.00MiB".to_string()),
                speed: Some("1.20MiB/s".to_string()),
                eta: Some("00:05".to_string()),
            }
        );
    }

    #[test]
    fn parses_ytdlp_line_with_unknown_fields() {
        let update = parse_transfer_line("[download] 100% of 3.10MiB").unwrap();
        match update {
            TransferUpdate::Download { percent, total, speed, eta } => {
                assert_eq!(percent, 100.0);
                assert_eq!(total.as_deref(), Some("3.10MiB"));
                assert_eq!(speed, None);
                assert_eq!(eta, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_ffmpeg_stats_line() {
        let update = parse_transfer_line(
            "size=     768kB time=00:01:02.50 bitrate= 100.6kbits/s speed=31.2x",
        )
        .unwrap();
        assert_eq!(
            update,
            TransferUpdate::Encode {
                time: Duration::from_millis(62_500),
                speed: Some(31.2),
            }
        );
    }

    #[test]
    fn ignores_other_lines() {
        assert_eq!(parse_transfer_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_transfer_line("[download] Destination: input.mp4"), None);
    }

    #[test]
    fn negative_ffmpeg_time_is_zero() {
        assert_eq!(parse_ffmpeg_time("-00:00:00.02"), Some(Duration::ZERO));
        assert_eq!(parse_ffmpeg_time("00:00"), None);
    }

    #[test]
    fn oversized_ffmpeg_time_is_ignored() {
        assert_eq!(parse_ffmpeg_time("99999999999999999:00:00"), None);
        assert_eq!(
            parse_transfer_line(
                "[generic] Extracting URL: https://x.test/?time=99999999999999999:00:00&size=1"
            ),
            None
        );
    }
}

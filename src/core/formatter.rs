use std::time::Duration;

use crate::core::event::PipelineEvent;
use crate::core::progress::TransferUpdate;

pub fn format_event_line(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::Log(line) => line.clone(),
        PipelineEvent::Progress { percent, status } => format!("[{percent:>3}%] {status}"),
    }
}

pub fn format_transfer_line(update: &TransferUpdate) -> String {
    match update {
        TransferUpdate::Download {
            percent,
            total,
            speed,
            eta,
        } => {
            let total = total.as_deref().unwrap_or("?");
            let speed = speed.as_deref().unwrap_or("--");
            let eta = eta.as_deref().unwrap_or("--:--");
            format!("download {percent:.1}% of {total} at {speed} eta {eta}")
        }
        TransferUpdate::Encode { time, speed } => {
            let speed = speed
                .map(|s| format!("{s}x"))
                .unwrap_or_else(|| "--".to_string());
            format!("encode time={} speed={speed}", format_duration(*time))
        }
    }
}

/// `[=====>    ]` for a percentage in `[0, 100]`.
pub fn format_percent_bar(percent: u8, width: usize) -> String {
    let width = width.max(10);
    let ratio = f64::from(percent.min(100)) / 100.0;
    let filled = ((ratio * width as f64).round() as usize).min(width);

    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    for idx in 0..width {
        if idx < filled {
            bar.push('=');
        } else if idx == filled {
            bar.push('>');
        } else {
            bar.push(' ');
        }
    }
    bar.push(']');
    bar
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_progress_events() {
        let event = PipelineEvent::Progress {
            percent: 60,
            status: "Video download complete.".to_string(),
        };
        assert_eq!(format_event_line(&event), "[ 60%] Video download complete.");
        assert_eq!(
            format_event_line(&PipelineEvent::Log("raw".to_string())),
            "raw"
        );
    }

    #[test]
    fn percent_bar_edges() {
        assert_eq!(format_percent_bar(0, 10), "[>         ]");
        assert_eq!(format_percent_bar(60, 10), "[======>   ]");
        assert_eq!(format_percent_bar(100, 10), "[==========]");
    }

    #[test]
    fn formats_transfer_updates() {
        let encode = TransferUpdate::Encode {
            time: Duration::from_secs(3725),
            speed: Some(2.5),
        };
        assert_eq!(format_transfer_line(&encode), "encode time=01:02:05 speed=2.5x");

        let download = TransferUpdate::Download {
            percent: 12.0,
            total: None,
            speed: None,
            eta: None,
        };
        assert_eq!(
            format_transfer_line(&download),
            "download 12.0% of ? at -- eta --:--"
        );
    }
}

use crate::core::error::PipelineError;

/// Parses `[[HH:]MM:]SS[.frac]` into seconds. A decimal comma is accepted in
/// place of the point.
pub fn parse_timestamp(input: &str) -> Result<f64, PipelineError> {
    let invalid = || PipelineError::InvalidTimeFormat {
        input: input.to_string(),
    };

    let normalized = input.trim().replace(',', ".");
    if normalized.is_empty() {
        return Err(invalid());
    }

    let parts: Vec<&str> = normalized.split(':').map(str::trim).collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    let (seconds_part, head) = match parts.split_last() {
        Some(split) => split,
        None => return Err(invalid()),
    };

    let (whole, fraction) = match seconds_part.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (*seconds_part, None),
    };

    let seconds = parse_group(whole).ok_or_else(invalid)?;
    let fraction = match fraction {
        Some(digits) => parse_fraction(digits).ok_or_else(invalid)?,
        None => 0.0,
    };

    let mut groups = Vec::with_capacity(head.len());
    for group in head {
        groups.push(parse_group(group).ok_or_else(invalid)?);
    }
    let (hours, minutes) = match groups.as_slice() {
        [] => (0, 0),
        [minutes] => (0, *minutes),
        [hours, minutes] => (*hours, *minutes),
        _ => return Err(invalid()),
    };

    Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64 + fraction)
}

fn parse_group(group: &str) -> Option<u64> {
    if group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    group.parse::<u64>().ok()
}

fn parse_fraction(digits: &str) -> Option<f64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    format!("0.{digits}").parse::<f64>().ok()
}

/// Rounds to the millisecond precision passed to ffmpeg.
pub fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Renders seconds the way ffmpeg accepts them on `-ss`/`-t`: `30`, `12.5`.
pub fn format_seconds(seconds: f64) -> String {
    format!("{}", round_millis(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_seconds() {
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert_eq!(parse_timestamp(" 7.25 ").unwrap(), 7.25);
    }

    #[test]
    fn parses_minutes_and_hours() {
        assert_eq!(parse_timestamp("1:30").unwrap(), 90.0);
        assert_eq!(parse_timestamp("01:01:01.5").unwrap(), 3661.5);
        assert_eq!(parse_timestamp("0:00").unwrap(), 0.0);
    }

    #[test]
    fn accepts_decimal_comma() {
        assert_eq!(parse_timestamp("1:30,25").unwrap(), 90.25);
    }

    #[test]
    fn is_pure() {
        let first = parse_timestamp("2:03:04.75").unwrap();
        let second = parse_timestamp("2:03:04.75").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, 7384.75);
    }

    #[test]
    fn rejects_malformed_input() {
        for input in [
            "", "   ", "abc", "1:2:3:4", "1::2", ":30", "1:30.", "-5", "1.2.3", "1:3a", "+4",
        ] {
            match parse_timestamp(input) {
                Err(PipelineError::InvalidTimeFormat { input: echoed }) => {
                    assert_eq!(echoed, input)
                }
                other => panic!("expected InvalidTimeFormat for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn fraction_only_allowed_on_seconds() {
        assert!(parse_timestamp("1.5:30").is_err());
    }

    #[test]
    fn formats_seconds_for_ffmpeg() {
        assert_eq!(format_seconds(30.0), "30");
        assert_eq!(format_seconds(12.5), "12.5");
        assert_eq!(format_seconds(0.0), "0");
    }

    #[test]
    fn rounds_to_millis() {
        assert_eq!(round_millis(10.0004), 10.0);
        assert_eq!(round_millis(1.2346), 1.235);
    }
}

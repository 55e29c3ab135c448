// Timecode grammar: HH:MM:SS[.fff], MM:SS[.fff], or a bare number of minutes

use std::time::Duration;

use crate::downloader::errors::DownloadError;

fn malformed(raw: &str, why: &str) -> DownloadError {
    DownloadError::SplitSpecMalformed(format!("invalid timecode '{}': {}", raw, why))
}

fn whole(raw: &str, part: &str) -> Result<u64, DownloadError> {
    part.trim()
        .parse::<u64>()
        .map_err(|_| malformed(raw, "expected a whole number before ':'"))
}

fn fractional(raw: &str, part: &str) -> Result<f64, DownloadError> {
    let value = part
        .trim()
        .parse::<f64>()
        .map_err(|_| malformed(raw, "expected a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(malformed(raw, "must be a non-negative number"));
    }
    Ok(value)
}

pub fn parse_timecode(raw: &str) -> Result<Duration, DownloadError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(malformed(raw, "empty"));
    }

    let parts: Vec<&str> = s.split(':').collect();
    let (base, rest) = match parts.as_slice() {
        [h, m, sec] => {
            let (h, m) = (whole(raw, h)?, whole(raw, m)?);
            let base = h
                .checked_mul(3600)
                .and_then(|h| m.checked_mul(60)?.checked_add(h));
            (base, fractional(raw, sec)?)
        }
        [m, sec] => (whole(raw, m)?.checked_mul(60), fractional(raw, sec)?),
        // Bare number means minutes
        [minutes] => (Some(0), fractional(raw, minutes)? * 60.0),
        _ => return Err(malformed(raw, "too many ':' separators")),
    };

    let base = base.ok_or_else(|| malformed(raw, "out of range"))?;
    let rest = Duration::try_from_secs_f64(rest).map_err(|_| malformed(raw, "out of range"))?;
    Duration::from_secs(base)
        .checked_add(rest)
        .ok_or_else(|| malformed(raw, "out of range"))
}

/// Seconds from an external source (chapter times); `None` when unrepresentable
pub fn seconds_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs.max(0.0)).ok()
}

/// `H:MM:SS.mmm` for logs and ffmpeg metadata
pub fn format_timecode(d: Duration) -> String {
    let millis = d.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1000) % 60;
    format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_minutes_seconds() {
        assert_eq!(parse_timecode("1:02:03").unwrap(), Duration::from_secs(3723));
        assert_eq!(parse_timecode("0:00:01.5").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_minutes_seconds() {
        assert_eq!(parse_timecode("2:30").unwrap(), Duration::from_secs(150));
        assert_eq!(parse_timecode(" 0:00 ").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_bare_number_is_minutes() {
        assert_eq!(parse_timecode("3").unwrap(), Duration::from_secs(180));
        assert_eq!(parse_timecode("1.5").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_rejects_garbage() {
        for bad in [
            "",
            "abc",
            "1:2:3:4",
            "1:xx",
            "-1",
            "1:-5",
            "inf",
            "1e300",
            "9999999999999999999:00:00",
            "0:1e300",
            "18446744073709551615:00",
        ] {
            assert!(
                matches!(parse_timecode(bad), Err(DownloadError::SplitSpecMalformed(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_external_seconds() {
        assert_eq!(seconds_to_duration(-3.0), Some(Duration::ZERO));
        assert_eq!(seconds_to_duration(90.5), Some(Duration::from_millis(90_500)));
        assert_eq!(seconds_to_duration(1e300), None);
        assert_eq!(seconds_to_duration(f64::INFINITY), None);
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(Duration::from_millis(3_723_250)), "1:02:03.250");
        assert_eq!(format_timecode(Duration::ZERO), "0:00:00.000");
    }
}

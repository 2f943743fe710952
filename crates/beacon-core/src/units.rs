//! Duration and byte-size helpers for config values and warning text.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;
const PB: u64 = TB * 1024;
const EB: u64 = PB * 1024;

/// Parse a duration string like "500ms", "20s" or "5m".
///
/// A bare number is read as milliseconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    let (digits, unit_ms) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else {
        (s, 1)
    };

    let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
    let millis = value.checked_mul(unit_ms).ok_or_else(invalid)?;
    Ok(Duration::from_millis(millis))
}

/// Parse a byte size like "5368709120", "512MB" or "50 GB".
///
/// Suffixes are case-insensitive and use binary multiples.
pub fn parse_byte_size(s: &str) -> ConfigResult<u64> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidByteSize(s.to_string());

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, suffix) = s.split_at(split);
    if digits.is_empty() {
        return Err(invalid());
    }
    let value: u64 = digits.parse().map_err(|_| invalid())?;

    let multiplier = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => KB,
        "M" | "MB" | "MIB" => MB,
        "G" | "GB" | "GIB" => GB,
        "T" | "TB" | "TIB" => TB,
        _ => return Err(invalid()),
    };

    value.checked_mul(multiplier).ok_or_else(invalid)
}

/// Human-readable size, rounded down to the largest whole unit.
///
/// `5368709120` renders as "5 GB", `1023` as "1023 bytes".
pub fn display_size(bytes: u64) -> String {
    for (unit, label) in [(EB, "EB"), (PB, "PB"), (TB, "TB"), (GB, "GB"), (MB, "MB"), (KB, "KB")] {
        if bytes / unit > 0 {
            return format!("{} {label}", bytes / unit);
        }
    }
    format!("{bytes} bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("20s").unwrap(), Duration::from_secs(20));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration(" 20000 ").unwrap(), Duration::from_millis(20_000));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(matches!(parse_duration("soon"), Err(ConfigError::InvalidDuration(_))));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn parse_byte_size_values() {
        assert_eq!(parse_byte_size("5368709120").unwrap(), 5 * GB);
        assert_eq!(parse_byte_size("512MB").unwrap(), 512 * MB);
        assert_eq!(parse_byte_size("50 GB").unwrap(), 50 * GB);
        assert_eq!(parse_byte_size("1tib").unwrap(), TB);
        assert_eq!(parse_byte_size("64k").unwrap(), 64 * KB);
    }

    #[test]
    fn parse_byte_size_rejects_garbage() {
        assert!(matches!(parse_byte_size("lots"), Err(ConfigError::InvalidByteSize(_))));
        assert!(parse_byte_size("12 parsecs").is_err());
        assert!(parse_byte_size("99999999999TB").is_err());
    }

    #[test]
    fn display_size_rounds_down() {
        assert_eq!(display_size(5 * GB), "5 GB");
        assert_eq!(display_size(50 * GB + 700 * MB), "50 GB");
        assert_eq!(display_size(512 * MB), "512 MB");
        assert_eq!(display_size(2 * TB), "2 TB");
        assert_eq!(display_size(1023), "1023 bytes");
        assert_eq!(display_size(0), "0 bytes");
    }
}

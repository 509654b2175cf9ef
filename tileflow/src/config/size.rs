//! Human-readable byte sizes.

use thiserror::Error;

/// A size string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid size '{0}' (expected a number with optional KB, MB or GB suffix)")]
pub struct SizeParseError(String);

/// Parse a size such as `512MB`, `2 GB`, `64k` or `4096`.
///
/// Suffixes are binary multiples and case-insensitive. A bare number is bytes.
///
/// # Examples
///
/// ```
/// use tileflow::config::parse_size;
///
/// assert_eq!(parse_size("512MB").unwrap(), 512 * 1024 * 1024);
/// assert_eq!(parse_size("64k").unwrap(), 64 * 1024);
/// assert!(parse_size("lots").is_err());
/// ```
pub fn parse_size(s: &str) -> Result<u64, SizeParseError> {
    let trimmed = s.trim();
    let upper = trimmed.to_ascii_uppercase();

    const SUFFIXES: [(&str, u64); 7] = [
        ("GB", 1 << 30),
        ("G", 1 << 30),
        ("MB", 1 << 20),
        ("M", 1 << 20),
        ("KB", 1 << 10),
        ("K", 1 << 10),
        ("B", 1),
    ];

    let (number, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, multiplier)| {
            upper
                .strip_suffix(suffix)
                .map(|number| (number.trim().to_string(), *multiplier))
        })
        .unwrap_or_else(|| (upper.clone(), 1));

    let value: u64 = number.parse().map_err(|_| SizeParseError(s.to_string()))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| SizeParseError(s.to_string()))
}

/// Format a byte count with the largest whole binary unit.
///
/// ```
/// use tileflow::config::format_size;
///
/// assert_eq!(format_size(512 * 1024 * 1024), "512MB");
/// assert_eq!(format_size(1536), "1536B");
/// ```
pub fn format_size(bytes: u64) -> String {
    for (suffix, unit) in [("GB", 1u64 << 30), ("MB", 1 << 20), ("KB", 1 << 10)] {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{}{}", bytes / unit, suffix);
        }
    }
    format!("{}B", bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("2 GB").unwrap(), 2 << 30);
        assert_eq!(parse_size(" 10mb ").unwrap(), 10 << 20);
        assert_eq!(parse_size("100B").unwrap(), 100);
        assert!(parse_size("").is_err());
        assert!(parse_size("-1MB").is_err());
        assert!(parse_size("1.5GB").is_err());
    }

    #[test]
    fn test_format_round_trips_whole_units() {
        for bytes in [1u64 << 30, 3 << 20, 7 << 10, 999] {
            assert_eq!(parse_size(&format_size(bytes)).unwrap(), bytes);
        }
    }
}

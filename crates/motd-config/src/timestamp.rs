//! The `yyyyMMdd:HHmm` timestamp form used by `startsAt` and `expiresAt`.
//!
//! Timestamps are wall-clock values without a zone; callers compare them
//! against local time.

use chrono::NaiveDateTime;

use crate::error::ConfigError;

/// `chrono` format string for `yyyyMMdd:HHmm`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d:%H%M";

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ConfigError> {
    let trimmed = value.trim();
    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT).map_err(|e| {
        ConfigError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format_timestamp(at(2024, 3, 5, 7, 9)), "20240305:0709");
        assert_eq!(format_timestamp(at(2099, 12, 31, 23, 59)), "20991231:2359");
    }

    #[test]
    fn parses_canonical_form() {
        assert_eq!(parse_timestamp("20991231:2359").unwrap(), at(2099, 12, 31, 23, 59));
        assert_eq!(parse_timestamp(" 20240101:0000 ").unwrap(), at(2024, 1, 1, 0, 0));
    }

    #[test]
    fn seconds_are_dropped_when_formatting() {
        let with_seconds = at(2024, 1, 1, 9, 30) + chrono::Duration::seconds(42);
        assert_eq!(
            parse_timestamp(&format_timestamp(with_seconds)).unwrap(),
            at(2024, 1, 1, 9, 30)
        );
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in ["", "20991231", "2099-12-31 23:59", "20991331:0000", "20991231:2460", "tomorrow"] {
            assert!(
                matches!(parse_timestamp(bad), Err(ConfigError::InvalidTimestamp { .. })),
                "{bad:?} should not parse"
            );
        }
    }
}

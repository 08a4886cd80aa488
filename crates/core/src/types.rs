/// Absolute instants (partition boundaries, run bookkeeping) are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Scene acquisition times as stored in `TIMESTAMP` columns (no zone).
pub type AcquisitionTime = chrono::NaiveDateTime;

/// Calendar day used to bucket the timeline aggregation.
pub type AcquisitionDate = chrono::NaiveDate;

/// Input format for start/end filters on the command line.
pub const CLI_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Parse a `DD/MM/YYYY HH:MM:SS` command-line date, interpreted as UTC.
pub fn parse_cli_datetime(value: &str) -> Result<Timestamp, crate::error::CoreError> {
    chrono::NaiveDateTime::parse_from_str(value.trim(), CLI_DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            crate::error::CoreError::Validation(format!(
                "Not a valid date '{value}' (expected DD/MM/YYYY HH:MM:SS): {e}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_day_first_datetime() {
        let ts = parse_cli_datetime("31/01/2020 23:59:58").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2020, 1, 31));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (23, 59, 58));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert!(parse_cli_datetime(" 01/01/2020 00:00:00 ").is_ok());
    }

    #[test]
    fn month_first_is_rejected() {
        assert!(parse_cli_datetime("01/31/2020 00:00:00").is_err());
    }

    #[test]
    fn date_without_time_is_rejected() {
        assert!(parse_cli_datetime("01/01/2020").is_err());
    }
}

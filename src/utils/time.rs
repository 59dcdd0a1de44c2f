use chrono::{DateTime, SecondsFormat, Utc};

/// Format an instant as an ISO-8601 UTC timestamp with millisecond precision
/// (e.g. `2024-05-01T12:30:00.000Z`)
pub fn iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_iso_timestamp() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(iso_timestamp(instant), "2024-05-01T12:30:00.000Z");
    }

    #[test]
    fn test_iso_timestamp_keeps_millis() {
        let instant = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert!(iso_timestamp(instant).ends_with(".123Z"));
    }
}

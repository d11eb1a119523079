use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a timestamp as stored by the database.
///
/// SQLite's datetime('now') writes "YYYY-MM-DD HH:MM:SS" without a timezone;
/// rows written by other tools may carry full RFC 3339. Accept both.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>().ok().or_else(|| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_format() {
        let ts = parse_timestamp("2026-08-05 14:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-08-05T14:30:00+00:00");
    }

    #[test]
    fn parses_rfc3339() {
        assert!(parse_timestamp("2026-08-05T14:30:00Z").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }
}

//! InfluxQL text helpers.

use chrono::{DateTime, SecondsFormat, Utc};

/// Double-quotes an identifier (measurement, field or tag key).
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Single-quotes a string literal (tag value or timestamp).
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Renders an absolute time bound, e.g. `'2026-10-19T12:00:00.000000000Z'`.
pub fn time_literal(t: DateTime<Utc>) -> String {
    quote_literal(&t.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("wind_dir"), r#""wind_dir""#);
        assert_eq!(quote_ident(r#"we"ird"#), r#""we\"ird""#);
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("roof"), "'roof'");
        assert_eq!(quote_literal(r"a\b'c"), r"'a\\b\'c'");
    }

    #[test]
    fn test_time_literal() {
        let t = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert_eq!(time_literal(t), "'2026-10-19T12:00:00.000000000Z'");
    }
}

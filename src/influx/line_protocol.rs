//! Line protocol encoding for writes.

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use std::fmt::Write;

use crate::store::{FieldValue, Point};

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_string_value(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Encodes one point as a single line, without the trailing newline.
///
/// # Errors
///
/// Fails for points without fields, non-finite floats, and timestamps
/// outside the nanosecond range.
pub fn encode_point(point: &Point) -> Result<String> {
    if point.fields.is_empty() {
        bail!("point for '{}' has no fields", point.measurement);
    }

    let mut line = escape_measurement(&point.measurement);
    for (k, v) in &point.tags {
        write!(line, ",{}={}", escape_key(k), escape_key(v))?;
    }

    let mut sep = ' ';
    for (k, v) in &point.fields {
        match v {
            FieldValue::Float(f) => {
                if !f.is_finite() {
                    bail!("field '{k}' is not finite: {f}");
                }
                write!(line, "{sep}{}={f}", escape_key(k))?;
            }
            FieldValue::Str(s) => {
                write!(line, "{sep}{}=\"{}\"", escape_key(k), escape_string_value(s))?;
            }
        }
        sep = ',';
    }

    let ns = point
        .time
        .timestamp_nanos_opt()
        .with_context(|| format!("timestamp {} out of range", point.time))?;
    write!(line, " {ns}")?;

    Ok(line)
}

/// Encodes a batch as newline-separated lines.
pub fn encode_batch(points: &[Point]) -> Result<Bytes> {
    let mut body = String::new();
    for point in points {
        body.push_str(&encode_point(point)?);
        body.push('\n');
    }
    Ok(Bytes::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn point() -> Point {
        let mut tags = BTreeMap::new();
        tags.insert("station".to_string(), "back yard".to_string());
        tags.insert("aggregator".to_string(), "wx/0.1.0".to_string());
        let mut fields = BTreeMap::new();
        fields.insert("wind_dir_mean_5m".to_string(), FieldValue::Float(12.5));
        fields.insert(
            "wind_dir_mean_intercardinal_5m".to_string(),
            FieldValue::from("NNE"),
        );
        Point {
            measurement: "weather station_agg".to_string(),
            tags,
            fields,
            time: Utc.timestamp_opt(1_700_000_000, 5).unwrap(),
        }
    }

    #[test]
    fn test_encode_point() {
        let line = encode_point(&point()).unwrap();
        assert_eq!(
            line,
            "weather\\ station_agg,aggregator=wx/0.1.0,station=back\\ yard \
             wind_dir_mean_5m=12.5,wind_dir_mean_intercardinal_5m=\"NNE\" \
             1700000000000000005"
        );
    }

    #[test]
    fn test_escapes_keys_and_strings() {
        assert_eq!(escape_key("a,b=c d"), "a\\,b\\=c\\ d");
        assert_eq!(escape_string_value(r#"say "hi"\"#), r#"say \"hi\"\\"#);
    }

    #[test]
    fn test_rejects_empty_and_non_finite_fields() {
        let mut p = point();
        p.fields.clear();
        assert!(encode_point(&p).is_err());

        let mut p = point();
        p.fields
            .insert("bad".to_string(), FieldValue::Float(f64::NAN));
        assert!(encode_point(&p).is_err());
    }

    #[test]
    fn test_encode_batch_one_line_per_point() {
        let body = encode_batch(&[point(), point()]).unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
    }
}

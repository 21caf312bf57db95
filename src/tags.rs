//! Tag filters: parsed from `k=v,k=v`, used to scope queries and to stamp
//! output points.

use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::influx::query::{quote_ident, quote_literal};

/// Tag key reserved for the aggregator identity stamped on every write.
pub const AGGREGATOR_TAG: &str = "aggregator";

/// A conjunctive equality filter over series tags.
///
/// Keys are kept sorted so generated queries and written points are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: BTreeMap<String, String>,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list of `key=value` pairs.
    ///
    /// The empty string yields an empty filter.
    ///
    /// # Errors
    ///
    /// Returns an error for pairs without exactly one `=`, empty keys or
    /// values, duplicate keys, and the reserved [`AGGREGATOR_TAG`] key.
    pub fn parse(input: &str) -> Result<Self> {
        let mut tags = BTreeMap::new();
        if input.trim().is_empty() {
            return Ok(Self { tags });
        }

        for pair in input.split(',') {
            let parts: Vec<&str> = pair.split('=').map(str::trim).collect();
            let [key, value] = parts.as_slice() else {
                bail!("invalid tag: {pair:?}");
            };
            if key.is_empty() || value.is_empty() {
                bail!("invalid tag: {pair:?}");
            }
            if *key == AGGREGATOR_TAG {
                bail!("tag key '{AGGREGATOR_TAG}' is reserved");
            }
            if tags.insert(key.to_string(), value.to_string()).is_some() {
                bail!("duplicate tag: {key}");
            }
        }

        Ok(Self { tags })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the filter as InfluxQL conditions to append after an
    /// existing `WHERE` clause, e.g. ` AND "station"='roof'`.
    ///
    /// Returns an empty string when there are no tags.
    pub fn where_clause(&self) -> String {
        self.iter()
            .map(|(k, v)| format!(" AND {}={}", quote_ident(k), quote_literal(v)))
            .collect()
    }

    /// Returns the tag set for output points: this filter plus the
    /// aggregator identity.
    pub fn with_identity(&self, identity: &str) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.insert(AGGREGATOR_TAG.to_string(), identity.to_string());
        tags
    }
}

impl FromStr for TagFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", joined.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_is_empty_filter() {
        let filter = TagFilter::parse("").unwrap();
        assert_eq!(filter, TagFilter::new());
        assert_eq!(filter.where_clause(), "");
    }

    #[test]
    fn test_parse_pairs() {
        let filter = TagFilter::parse("station=roof, sensor = davis").unwrap();
        let pairs: Vec<_> = filter.iter().collect();
        assert_eq!(pairs, vec![("sensor", "davis"), ("station", "roof")]);
    }

    #[test]
    fn test_parse_rejects_malformed_pairs() {
        assert!(TagFilter::parse("station").is_err());
        assert!(TagFilter::parse("a=b=c").is_err());
        assert!(TagFilter::parse("=roof").is_err());
        assert!(TagFilter::parse("station=").is_err());
        assert!(TagFilter::parse("a=b,").is_err());
    }

    #[test]
    fn test_parse_rejects_duplicates_and_reserved_key() {
        assert!(TagFilter::parse("a=b,a=c").is_err());
        assert!(TagFilter::parse("aggregator=me").is_err());
    }

    #[test]
    fn test_where_clause_is_sorted_and_quoted() {
        let filter = TagFilter::parse("z=1,a=it's").unwrap();
        assert_eq!(filter.where_clause(), r#" AND "a"='it\'s' AND "z"='1'"#);
    }

    #[test]
    fn test_with_identity_adds_aggregator_tag() {
        let filter = TagFilter::parse("station=roof").unwrap();
        let tags = filter.with_identity("wx/1.0");
        assert_eq!(tags.get("station").map(String::as_str), Some("roof"));
        assert_eq!(tags.get(AGGREGATOR_TAG).map(String::as_str), Some("wx/1.0"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let filter = TagFilter::parse("b=2,a=1").unwrap();
        assert_eq!(filter.to_string(), "a=1,b=2");
        assert_eq!(filter.to_string().parse::<TagFilter>().unwrap(), filter);
    }
}

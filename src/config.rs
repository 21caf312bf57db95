//! Destination-store settings read from the environment, plus the process
//! constants shared by the CLI and the engine.

use anyhow::{Result, bail};
use std::time::Duration;

pub const PRODUCT_NAME: &str = "wx-station-aggregator";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const INFLUX_READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const INFLUX_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
pub const INFLUX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const INFLUX_WRITE_ATTEMPTS: u32 = 2;
pub const INFLUX_WRITE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Value of the `aggregator` tag stamped on every written point.
pub fn aggregator_identity() -> String {
    format!("{PRODUCT_NAME}/{VERSION}")
}

/// How requests authenticate against InfluxDB.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    None,
    /// Sent as the `u` and `p` query parameters.
    UserPassword { username: String, password: String },
    /// Sent as `Authorization: Token <token>`.
    Token(String),
}

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://localhost:8086`.
    pub server: String,
    pub database: String,
    pub retention_policy: Option<String>,
    pub credentials: Credentials,
    pub query_timeout: Duration,
    pub write_timeout: Duration,
    pub connect_timeout: Duration,
    /// Gzip-compress write bodies.
    pub gzip: bool,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            database: String::new(),
            retention_policy: None,
            credentials: Credentials::None,
            query_timeout: INFLUX_READ_TIMEOUT,
            write_timeout: INFLUX_WRITE_TIMEOUT,
            connect_timeout: INFLUX_CONNECT_TIMEOUT,
            gzip: false,
        }
    }
}

impl InfluxConfig {
    /// Reads `INFLUX_SERVER`, `INFLUX_DB`, `INFLUX_RP`, `INFLUX_USERNAME`,
    /// `INFLUX_PASSWORD` and `INFLUX_TOKEN` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(server) = get("INFLUX_SERVER") else {
            bail!("INFLUX_SERVER must be set");
        };
        let Some(database) = get("INFLUX_DB") else {
            bail!("INFLUX_DB must be set");
        };

        let credentials = match (
            get("INFLUX_USERNAME"),
            get("INFLUX_PASSWORD"),
            get("INFLUX_TOKEN"),
        ) {
            (None, None, None) => Credentials::None,
            (None, None, Some(token)) => Credentials::Token(token),
            (Some(username), Some(password), None) => {
                Credentials::UserPassword { username, password }
            }
            (_, _, Some(_)) => {
                bail!("INFLUX_TOKEN cannot be combined with INFLUX_USERNAME/INFLUX_PASSWORD")
            }
            _ => bail!("INFLUX_USERNAME and INFLUX_PASSWORD must be set together"),
        };

        Ok(Self {
            server,
            database,
            retention_policy: get("INFLUX_RP"),
            credentials,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config() {
        let cfg = InfluxConfig::from_lookup(lookup(&[
            ("INFLUX_SERVER", "http://localhost:8086"),
            ("INFLUX_DB", "weather"),
            ("INFLUX_RP", ""),
        ]))
        .unwrap();

        assert_eq!(cfg.server, "http://localhost:8086");
        assert_eq!(cfg.database, "weather");
        assert_eq!(cfg.retention_policy, None);
        assert_eq!(cfg.credentials, Credentials::None);
        assert_eq!(cfg.query_timeout, INFLUX_READ_TIMEOUT);
        assert_eq!(cfg.write_timeout, INFLUX_WRITE_TIMEOUT);
    }

    #[test]
    fn test_missing_server_or_db() {
        assert!(InfluxConfig::from_lookup(lookup(&[("INFLUX_DB", "weather")])).is_err());
        assert!(InfluxConfig::from_lookup(lookup(&[("INFLUX_SERVER", "http://x")])).is_err());
    }

    #[test]
    fn test_credentials() {
        let base = [("INFLUX_SERVER", "http://x"), ("INFLUX_DB", "db")];

        let with = |extra: &[(&str, &str)]| {
            let mut vars = base.to_vec();
            vars.extend_from_slice(extra);
            InfluxConfig::from_lookup(lookup(&vars))
        };

        assert_eq!(
            with(&[("INFLUX_USERNAME", "wx"), ("INFLUX_PASSWORD", "pw")])
                .unwrap()
                .credentials,
            Credentials::UserPassword {
                username: "wx".into(),
                password: "pw".into()
            }
        );
        assert_eq!(
            with(&[("INFLUX_TOKEN", "t0k")]).unwrap().credentials,
            Credentials::Token("t0k".into())
        );
        assert!(with(&[("INFLUX_USERNAME", "wx")]).is_err());
        assert!(with(&[("INFLUX_TOKEN", "t"), ("INFLUX_PASSWORD", "pw")]).is_err());
    }

    #[test]
    fn test_aggregator_identity() {
        assert_eq!(
            aggregator_identity(),
            format!("wx-station-aggregator/{}", env!("CARGO_PKG_VERSION"))
        );
    }
}

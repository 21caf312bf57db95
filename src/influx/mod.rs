//! InfluxDB 1.x HTTP implementation of [`SeriesStore`].

pub mod auth;
mod basic;
mod client;
pub mod line_protocol;
pub mod query;
pub mod response;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Response, Url};
use std::io::Write;
use std::time::Duration;
use tracing::debug;

use crate::config::{Credentials, InfluxConfig};
use crate::store::{Point, Series, SeriesStore};

/// Builds the transport for `config`, wrapped in whichever credential
/// scheme it names.
pub fn http_client(config: &InfluxConfig) -> Result<Box<dyn HttpClient>> {
    let basic = BasicClient::new(config.connect_timeout)?;
    Ok(match &config.credentials {
        Credentials::None => Box::new(basic),
        Credentials::UserPassword { username, password } => Box::new(auth::UrlCredentials {
            inner: basic,
            username: username.clone(),
            password: password.clone(),
        }),
        Credentials::Token(token) => Box::new(auth::TokenAuth::new(basic, token)?),
    })
}

/// Query and write client for one database and retention policy.
pub struct InfluxClient<C> {
    http: C,
    base_url: Url,
    database: String,
    retention_policy: Option<String>,
    query_timeout: Duration,
    write_timeout: Duration,
    gzip: bool,
}

impl<C: HttpClient> InfluxClient<C> {
    pub fn new(http: C, config: &InfluxConfig) -> Result<Self> {
        let mut base = config.server.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("invalid INFLUX_SERVER '{}'", config.server))?;

        Ok(Self {
            http,
            base_url,
            database: config.database.clone(),
            retention_policy: config.retention_policy.clone(),
            query_timeout: config.query_timeout,
            write_timeout: config.write_timeout,
            gzip: config.gzip,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .with_context(|| format!("building {path} URL"))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn db_params(&self) -> Vec<(&str, &str)> {
        let mut params = vec![("db", self.database.as_str())];
        if let Some(rp) = &self.retention_policy {
            params.push(("rp", rp.as_str()));
        }
        params
    }

    async fn send(&self, mut req: Request, timeout: Duration) -> Result<Response> {
        *req.timeout_mut() = Some(timeout);
        let what = format!("{} {}", req.method(), req.url().path());

        let resp = self
            .http
            .execute(req)
            .await
            .with_context(|| format!("requesting {what}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("unexpected status {status} from {what}: {}", body.trim());
        }
        Ok(resp)
    }

    fn write_body(&self, points: &[Point]) -> Result<(Vec<u8>, bool)> {
        let body = line_protocol::encode_batch(points)?;
        if !self.gzip {
            return Ok((body.to_vec(), false));
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body)?;
        Ok((encoder.finish()?, true))
    }
}

#[async_trait]
impl<C: HttpClient> SeriesStore for InfluxClient<C> {
    async fn ping(&self) -> Result<()> {
        let url = self.endpoint("ping", &[])?;
        self.send(Request::new(Method::GET, url), self.query_timeout)
            .await
            .context("InfluxDB ping failed")?;
        Ok(())
    }

    async fn query(&self, query: &str) -> Result<Option<Series>> {
        debug!(query, "InfluxDB query");
        let mut params = self.db_params();
        params.push(("q", query));
        let url = self.endpoint("query", &params)?;

        let resp = self
            .send(Request::new(Method::GET, url), self.query_timeout)
            .await
            .context("InfluxDB query failed")?;
        let body = resp.bytes().await.context("reading query response")?;

        response::parse_query_response(&body)
    }

    async fn write(&self, points: &[Point]) -> Result<()> {
        let mut params = self.db_params();
        params.push(("precision", "ns"));
        let url = self.endpoint("write", &params)?;

        let (body, gzipped) = self.write_body(points)?;
        debug!(points = points.len(), bytes = body.len(), gzipped, "InfluxDB write");

        let mut req = Request::new(Method::POST, url);
        req.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if gzipped {
            req.headers_mut()
                .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }
        *req.body_mut() = Some(body.into());

        self.send(req, self.write_timeout)
            .await
            .context("InfluxDB write failed")?;
        Ok(())
    }
}

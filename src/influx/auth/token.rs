use crate::influx::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};

/// An [`HttpClient`] wrapper that sends `Authorization: Token <token>`.
pub struct TokenAuth<C> {
    inner: C,
    value: HeaderValue,
}

impl<C> TokenAuth<C> {
    /// Fails if the token cannot be carried in an HTTP header.
    pub fn new(inner: C, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Token {token}"))
            .context("INFLUX_TOKEN is not a valid header value")?;
        value.set_sensitive(true);
        Ok(Self { inner, value })
    }

    fn authorize(&self, req: &mut reqwest::Request) {
        req.headers_mut().insert(AUTHORIZATION, self.value.clone());
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for TokenAuth<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.authorize(&mut req);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_authorization_header() {
        let auth = TokenAuth::new((), "wx:secret").unwrap();
        let mut req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost:8086/ping".parse().unwrap(),
        );
        auth.authorize(&mut req);

        let header = req.headers().get(AUTHORIZATION).unwrap();
        assert_eq!(header.to_str().unwrap(), "Token wx:secret");
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_rejects_token_with_newline() {
        assert!(TokenAuth::new((), "bad\ntoken").is_err());
    }
}

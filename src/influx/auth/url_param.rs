use crate::influx::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends a username and password as the
/// `u` and `p` query parameters.
pub struct UrlCredentials<C> {
    pub inner: C,
    pub username: String,
    pub password: String,
}

impl<C> UrlCredentials<C> {
    fn authorize(&self, req: &mut reqwest::Request) {
        req.url_mut()
            .query_pairs_mut()
            .append_pair("u", &self.username)
            .append_pair("p", &self.password);
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlCredentials<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.authorize(&mut req);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_credentials_after_existing_params() {
        let creds = UrlCredentials {
            inner: (),
            username: "wx".into(),
            password: "p&ss".into(),
        };
        let mut req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost:8086/query?db=weather".parse().unwrap(),
        );
        creds.authorize(&mut req);

        assert_eq!(req.url().query(), Some("db=weather&u=wx&p=p%26ss"));
    }
}

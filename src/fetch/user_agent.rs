use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};

/// An [`HttpClient`] wrapper that identifies the application on every request.
///
/// Public geocoding services such as Nominatim reject requests that carry a
/// generic or missing `User-Agent`.
pub struct UserAgent<C> {
    inner: C,
    agent: HeaderValue,
}

impl<C> UserAgent<C> {
    pub fn new(inner: C, agent: &str) -> Result<Self> {
        let agent = HeaderValue::from_str(agent)
            .with_context(|| format!("invalid User-Agent value '{agent}'"))?;
        Ok(Self { inner, agent })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UserAgent<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert(USER_AGENT, self.agent.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_rejects_header_breaking_agent() {
        assert!(UserAgent::new(BasicClient::new(), "bad\nagent").is_err());
    }

    #[test]
    fn test_accepts_plain_agent() {
        assert!(UserAgent::new(BasicClient::new(), "subway_congestion/0.1").is_ok());
    }
}

mod basic;
mod client;
mod user_agent;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use user_agent::UserAgent;

use anyhow::{Result, bail};

/// GETs `url` and returns the body. Non-success statuses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: reqwest::Url) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("request failed with status {}: {}", status, body);
    }
    Ok(resp.bytes().await?.to_vec())
}

// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::ResolverConfig;

/// Create a configured asynchronous HTTP client that follows redirects.
pub fn create_async_client(config: &ResolverConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;
    Ok(client)
}

/// Follow redirects for `url` and return where they end.
///
/// Tries `HEAD` first; servers that reject it get a `GET` whose body is
/// never read.
pub async fn resolve_redirects(client: &reqwest::Client, url: &str) -> Option<String> {
    match client.head(url).send().await {
        Ok(response) => return Some(response.url().to_string()),
        Err(e) => log::debug!("HEAD {url} failed: {e}"),
    }
    match client.get(url).send().await {
        Ok(response) => Some(response.url().to_string()),
        Err(e) => {
            log::debug!("GET {url} failed: {e}");
            None
        }
    }
}

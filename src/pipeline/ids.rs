// src/pipeline/ids.rs

//! Recover numeric or pfbid identifiers from Facebook URLs.

use std::time::Duration;

use crate::error::Result;
use crate::models::{FacebookId, UrlRow};
use crate::services::Browser;
use crate::storage::LocalStorage;
use crate::utils::http::resolve_redirects;
use crate::utils::log;
use crate::utils::url::extract_facebook_id;

/// Identify every URL in `urls`, in order.
///
/// URLs without a recognisable id (share links, short links) are followed
/// through their redirects, first over HTTP and then in a browser tab.
pub async fn extract_facebook_ids(
    urls: &[String],
    client: Option<&reqwest::Client>,
    browser: Option<&dyn Browser>,
    settle: Duration,
) -> Vec<FacebookId> {
    let mut out = Vec::with_capacity(urls.len());
    for url in urls {
        out.push(identify(url, client, browser, settle).await);
    }
    out
}

async fn identify(
    url: &str,
    client: Option<&reqwest::Client>,
    browser: Option<&dyn Browser>,
    settle: Duration,
) -> FacebookId {
    if let Some((kind, id)) = extract_facebook_id(url) {
        return FacebookId {
            original_url: url.to_string(),
            kind,
            id,
            final_url: url.to_string(),
        };
    }

    let mut resolved = None;
    if let Some(client) = client {
        resolved = resolve_redirects(client, url).await;
    }
    if resolved.is_none() {
        resolved = match browser {
            Some(browser) => tab_resolve(browser, url, settle).await,
            None => None,
        };
    }

    let Some(final_url) = resolved else {
        return FacebookId::unknown(url, "");
    };

    match extract_facebook_id(&final_url) {
        Some((kind, id)) => FacebookId {
            original_url: url.to_string(),
            kind,
            id,
            final_url,
        },
        None => FacebookId::unknown(url, final_url),
    }
}

async fn tab_resolve(browser: &dyn Browser, url: &str, settle: Duration) -> Option<String> {
    match browser.resolve_in_tab(url, settle).await {
        Ok(landed) => landed,
        Err(e) => {
            log::debug(&format!("Tab resolve of {url} failed: {e}"));
            None
        }
    }
}

/// Identify the URLs of `input` and write them to `output`.
pub async fn run_ids(
    storage: &LocalStorage,
    input: &str,
    output: &str,
    client: Option<&reqwest::Client>,
    browser: Option<&dyn Browser>,
    settle: Duration,
) -> Result<Vec<FacebookId>> {
    log::header("Extracting Facebook ids");

    let rows: Vec<UrlRow> = storage.read_csv(input).await?;
    let urls: Vec<String> = rows.into_iter().map(|r| r.accounts).collect();
    let ids = extract_facebook_ids(&urls, client, browser, settle).await;

    let unknown = ids.iter().filter(|i| i.id.is_empty()).count();
    storage.write_csv(output, &ids).await?;

    log::summary(
        "Ids",
        &[
            ("URLs", urls.len().to_string()),
            ("Identified", (ids.len() - unknown).to_string()),
            ("Unknown", unknown.to_string()),
        ],
    );
    Ok(ids)
}

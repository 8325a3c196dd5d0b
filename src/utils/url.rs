// src/utils/url.rs

//! URL classification and Facebook id extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::IdKind;

/// Substrings that mark a Facebook URL as a video or reel.
pub const VIDEO_PATTERNS: [&str; 5] = ["watch/?v=", "/videos/", "/reel/", "/v/", "/r/"];

/// What a post URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Video,
    Post,
}

/// Which site a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Facebook,
    Twitter,
    Other,
}

/// Classify a Facebook URL as video (watch, videos, reels, shared videos) or post.
///
/// # Examples
/// ```
/// use postscrape::utils::url::{classify_url, UrlKind};
///
/// assert_eq!(classify_url("https://www.facebook.com/reel/994171912430118"), UrlKind::Video);
/// assert_eq!(classify_url("https://www.facebook.com/share/p/173dWFere7/"), UrlKind::Post);
/// ```
pub fn classify_url(url: &str) -> UrlKind {
    if VIDEO_PATTERNS.iter().any(|pat| url.contains(pat)) {
        UrlKind::Video
    } else {
        UrlKind::Post
    }
}

/// Detect the platform of a URL by host.
pub fn detect_platform(url: &str) -> Platform {
    let Some(host) = super::get_domain(url) else {
        return Platform::Other;
    };
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    let matches = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

    if matches("facebook.com") || matches("fb.watch") || matches("fb.com") {
        Platform::Facebook
    } else if matches("twitter.com") || matches("x.com") {
        Platform::Twitter
    } else {
        Platform::Other
    }
}

static QUERY_PATTERNS: LazyLock<Vec<(IdKind, Regex)>> = LazyLock::new(|| {
    compile(&[
        (IdKind::Watch, r"[?&]v=(\d{6,})"),
        (IdKind::Photo, r"[?&]fbid=(\d{6,})"),
        (IdKind::PermalinkStoryFbid, r"[?&]story_fbid=([^&]+)"),
    ])
});

static PATH_PATTERNS: LazyLock<Vec<(IdKind, Regex)>> = LazyLock::new(|| {
    compile(&[
        (IdKind::Video, r"/videos/(\d{6,})(?:/|$)"),
        (IdKind::Reel, r"/reel/(\d{6,})(?:/|$)"),
        (IdKind::PostPfbid, r"/posts/(pfbid[a-zA-Z0-9]+)"),
    ])
});

fn compile(patterns: &[(IdKind, &str)]) -> Vec<(IdKind, Regex)> {
    patterns
        .iter()
        .filter_map(|(kind, re)| Regex::new(re).ok().map(|re| (*kind, re)))
        .collect()
}

/// Recover `(kind, id)` from a Facebook URL.
///
/// Query-string ids (`watch?v=`, `photo?fbid=`, `permalink.php?story_fbid=`)
/// take priority over path ids (`/videos/`, `/reel/`, `/posts/pfbid…`).
pub fn extract_facebook_id(url: &str) -> Option<(IdKind, String)> {
    let (query, path) = match url::Url::parse(url) {
        Ok(parsed) => (
            format!("?{}", parsed.query().unwrap_or("")),
            parsed.path().to_string(),
        ),
        Err(_) => split_raw(url),
    };

    let find = |patterns: &[(IdKind, Regex)], haystack: &str| {
        patterns.iter().find_map(|(kind, re)| {
            re.captures(haystack)
                .and_then(|caps| caps.get(1))
                .map(|m| (*kind, m.as_str().to_string()))
        })
    };

    find(&QUERY_PATTERNS, &query).or_else(|| find(&PATH_PATTERNS, &path))
}

/// Split an unparseable URL into `("?query", path)` by hand.
fn split_raw(url: &str) -> (String, String) {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let (before, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));
    let path = match before.find("://") {
        Some(idx) => {
            let rest = &before[idx + 3..];
            rest.find('/').map_or("", |slash| &rest[slash..])
        }
        None => before,
    };
    (format!("?{query}"), path.to_string())
}

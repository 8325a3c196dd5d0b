// src/services/twitter.rs

//! Twitter/X tweet page parser.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::models::{Config, TweetRecord, UrlRow};
use crate::services::Browser;
use crate::utils::numbers::{normalize_digits, parse_count};
use crate::utils::{dom, resolve};

const ARTICLE: &str = "article[data-testid='tweet']";
const ARTICLE_XPATH: &str = "//article[@data-testid='tweet']";
const USER_LINK: &str = "div[data-testid='User-Name'] a";
const USER_LINK_XPATH: &str = "//div[@data-testid='User-Name']//a";
const TWEET_TEXT: &str = "div[dir='auto'][data-testid='tweetText']";
const RETWEET_BUTTON: &str = "button[data-testid='retweet']";
const PHOTO: &str = "div[data-testid='tweetPhoto'] img";

static ENGAGEMENT_PART: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([0-9][0-9,.]*\s*[KMB]?)\s+(repl(?:y|ies)|reposts?|retweets?|likes?|bookmarks?|views?)\b",
    )
    .ok()
});

/// Counts parsed out of the action bar's `aria-label`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engagement {
    pub replies: Option<u64>,
    pub reposts: Option<u64>,
    pub likes: Option<u64>,
    pub bookmarks: Option<u64>,
    pub views: Option<u64>,
}

/// Scrape one tweet row.
pub async fn scrape(browser: &dyn Browser, row: &UrlRow, config: &Config) -> TweetRecord {
    let url = row.accounts.trim();
    if url.is_empty() {
        return TweetRecord::empty(row);
    }

    let pacing = &config.pacing;
    if let Err(e) = browser.goto(url).await {
        log::warn!("Navigation failed for {url}: {e}");
        return TweetRecord::empty(row);
    }
    tokio::time::sleep(pacing.settle()).await;

    let loaded = browser
        .wait_for(ARTICLE_XPATH, pacing.wait_long())
        .await
        .unwrap_or(false);
    if !loaded {
        log::debug!("No tweet article on {url}");
        return TweetRecord::empty(row);
    }
    let _ = browser.wait_for(USER_LINK_XPATH, pacing.wait_short()).await;

    let page_url = browser.current_url().await.unwrap_or_else(|_| url.to_string());
    match browser.source().await {
        Ok(html) => extract_tweet(
            &Html::parse_document(&html),
            &page_url,
            &config.scrape.tweet_lang,
            row,
        ),
        Err(e) => {
            log::warn!("Could not read page source for {url}: {e}");
            TweetRecord::empty(row)
        }
    }
}

/// Every field of the first tweet on the page.
pub fn extract_tweet(document: &Html, page_url: &str, lang: &str, row: &UrlRow) -> TweetRecord {
    let Some(article) = first_article(document) else {
        return TweetRecord::empty(row);
    };

    let (username_link, username) = extract_user(article, page_url);
    let engagement_text = extract_engagement_label(article);
    let counts = engagement_text
        .as_deref()
        .map(parse_engagement_label)
        .unwrap_or_default();

    TweetRecord {
        news_id: row.news_id.clone(),
        tweet_link: row.accounts.clone(),
        username_link,
        username,
        text: extract_text(article, lang),
        engagement_text,
        image_link: extract_image(article),
        replies: counts.replies,
        reposts: counts.reposts,
        likes: counts.likes,
        bookmarks: counts.bookmarks,
        views: counts.views,
    }
}

pub fn first_article(document: &Html) -> Option<ElementRef<'_>> {
    dom::doc_first(document, ARTICLE)
}

/// `(profile link, display text)` of the tweet author.
pub fn extract_user(article: ElementRef<'_>, page_url: &str) -> (Option<String>, Option<String>) {
    let Some(anchor) = dom::first(article, USER_LINK) else {
        return (None, None);
    };
    let link = dom::attr(anchor, "href").map(|h| resolve(page_url, &h));
    (link, dom::non_empty_text(anchor))
}

/// Tweet text in `lang`, else in any language.
///
/// The fallback only applies when no `lang` node exists; an empty node in
/// the preferred language still yields null.
pub fn extract_text(article: ElementRef<'_>, lang: &str) -> Option<String> {
    let preferred = format!("{TWEET_TEXT}[lang='{lang}']");
    let node = dom::first(article, &preferred).or_else(|| dom::first(article, TWEET_TEXT))?;
    dom::non_empty_text(node)
}

/// The `aria-label` summarising replies, reposts, likes and views.
pub fn extract_engagement_label(article: ElementRef<'_>) -> Option<String> {
    let button = dom::first(article, RETWEET_BUTTON)?;

    let ancestor_checks: [fn(ElementRef<'_>) -> bool; 3] = [
        |el| el.value().attr("aria-label").is_some(),
        |el| el.value().name() == "div" && el.value().attr("aria-label").is_some(),
        |el| el.value().attr("role") == Some("group") && el.value().attr("aria-label").is_some(),
    ];

    ancestor_checks
        .iter()
        .find_map(|check| dom::ancestors(button).find(|el| check(*el)))
        .and_then(|el| el.value().attr("aria-label").map(str::to_string))
}

/// Split `"5 replies, 12 reposts, 301 likes, 4 bookmarks, 9,876 views"`
/// into named counts. Unrecognised parts are ignored.
pub fn parse_engagement_label(label: &str) -> Engagement {
    let mut counts = Engagement::default();
    let Some(re) = ENGAGEMENT_PART.as_ref() else {
        return counts;
    };

    let norm = normalize_digits(label);
    for caps in re.captures_iter(&norm) {
        let (Some(number), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = parse_count(number.as_str());
        let name = name.as_str().to_lowercase();
        let slot = match name.trim_end_matches('s') {
            "reply" | "replie" => &mut counts.replies,
            "repost" | "retweet" => &mut counts.reposts,
            "like" => &mut counts.likes,
            "bookmark" => &mut counts.bookmarks,
            "view" => &mut counts.views,
            _ => continue,
        };
        if slot.is_none() {
            *slot = value;
        }
    }
    counts
}

pub fn extract_image(article: ElementRef<'_>) -> Option<String> {
    dom::first(article, PHOTO).and_then(|img| dom::attr(img, "src"))
}

//! Input rows and scraped output records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Text recorded when the browser cannot open a row's URL.
pub const NAVIGATION_ERROR: &str = "ERR_NAME_NOT_RESOLVED";

/// One input row: a post URL and the news item it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlRow {
    /// Post URL (column name kept from the collection sheets)
    pub accounts: String,

    /// Opaque identifier of the news item
    pub news_id: String,
}

impl UrlRow {
    pub fn new(accounts: impl Into<String>, news_id: impl Into<String>) -> Self {
        Self {
            accounts: accounts.into(),
            news_id: news_id.into(),
        }
    }
}

/// Scraped fields of a Facebook post or reel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    pub news_id: String,
    pub url: String,
    pub text: Option<String>,
    pub like: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub username: Option<String>,
    pub profile_url: Option<String>,
    pub image_src: Option<String>,
}

impl PostRecord {
    /// Record for a row whose page never loaded.
    pub fn navigation_failed(row: &UrlRow) -> Self {
        Self {
            news_id: row.news_id.clone(),
            url: row.accounts.clone(),
            text: Some(NAVIGATION_ERROR.to_string()),
            ..Self::default()
        }
    }

    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn has_engagement(&self) -> bool {
        self.like.is_some() || self.comments.is_some() || self.shares.is_some()
    }

    /// The input row this record was scraped from.
    pub fn to_row(&self) -> UrlRow {
        UrlRow::new(&self.url, &self.news_id)
    }
}

impl fmt::Display for PostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "news_id={} like={} comments={} shares={} user={} text={}",
            self.news_id,
            show(&self.like),
            show(&self.comments),
            show(&self.shares),
            self.username.as_deref().unwrap_or("-"),
            preview(self.text.as_deref()),
        )
    }
}

/// Scraped fields of a tweet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetRecord {
    pub news_id: String,
    pub tweet_link: String,
    pub username_link: Option<String>,
    pub username: Option<String>,
    pub text: Option<String>,

    /// Raw `aria-label` of the action bar, e.g. "5 replies, 12 reposts, ..."
    pub engagement_text: Option<String>,

    pub image_link: Option<String>,
    pub replies: Option<u64>,
    pub reposts: Option<u64>,
    pub likes: Option<u64>,
    pub bookmarks: Option<u64>,
    pub views: Option<u64>,
}

impl TweetRecord {
    /// Record with only the row identity filled in.
    pub fn empty(row: &UrlRow) -> Self {
        Self {
            news_id: row.news_id.clone(),
            tweet_link: row.accounts.clone(),
            ..Self::default()
        }
    }
}

impl fmt::Display for TweetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "news_id={} user={} likes={} reposts={} text={}",
            self.news_id,
            self.username.as_deref().unwrap_or("-"),
            show(&self.likes),
            show(&self.reposts),
            preview(self.text.as_deref()),
        )
    }
}

/// Kind of identifier recovered from a Facebook URL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    Watch,
    Video,
    Reel,
    Photo,
    PermalinkStoryFbid,
    PostPfbid,
    Unknown,
}

/// Identifier recovered from a (possibly shortened) Facebook URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FacebookId {
    pub original_url: String,
    pub kind: IdKind,
    pub id: String,
    pub final_url: String,
}

impl FacebookId {
    pub fn unknown(original_url: impl Into<String>, final_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            kind: IdKind::Unknown,
            id: String::new(),
            final_url: final_url.into(),
        }
    }
}

fn show(value: &Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn preview(text: Option<&str>) -> String {
    match text {
        Some(t) if t.chars().count() > 60 => {
            let head: String = t.chars().take(60).collect();
            format!("{head}…")
        }
        Some(t) => t.to_string(),
        None => "-".to_string(),
    }
}

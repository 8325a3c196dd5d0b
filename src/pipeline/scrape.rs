// src/pipeline/scrape.rs

//! Scrape runs: rows in, one record per row out, one browser session.

use std::fmt;
use std::time::Duration;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, PostRecord, TweetRecord, UrlRow};
use crate::pipeline::clean::run_merge;
use crate::services::{Browser, facebook_post, facebook_reel, twitter};
use crate::storage::LocalStorage;
use crate::utils::log;

/// Which parser a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeKind {
    Posts,
    Reels,
    Tweets,
}

impl ScrapeKind {
    /// Chunk file prefix used when none is given.
    pub fn default_prefix(self) -> &'static str {
        match self {
            ScrapeKind::Posts => "FB_posts_info",
            ScrapeKind::Reels => "FB_vid_info",
            ScrapeKind::Tweets => "Twitter_info",
        }
    }
}

impl fmt::Display for ScrapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScrapeKind::Posts => "Facebook posts",
            ScrapeKind::Reels => "Facebook reels",
            ScrapeKind::Tweets => "tweets",
        };
        f.write_str(name)
    }
}

/// What a chunked run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub chunks_total: usize,
    pub chunks_written: usize,
    pub rows_scraped: usize,
    pub merged_rows: usize,
}

pub async fn scrape_facebook_posts(
    browser: &dyn Browser,
    rows: &[UrlRow],
    config: &Config,
) -> Vec<PostRecord> {
    scrape_rows(rows, config.pacing.row_delay(), async |row| {
        facebook_post::scrape(browser, row, config).await
    })
    .await
}

pub async fn scrape_facebook_reels(
    browser: &dyn Browser,
    rows: &[UrlRow],
    config: &Config,
) -> Vec<PostRecord> {
    scrape_rows(rows, config.pacing.row_delay(), async |row| {
        facebook_reel::scrape(browser, row, config).await
    })
    .await
}

pub async fn scrape_tweets(
    browser: &dyn Browser,
    rows: &[UrlRow],
    config: &Config,
) -> Vec<TweetRecord> {
    scrape_rows(rows, config.pacing.row_delay(), async |row| {
        twitter::scrape(browser, row, config).await
    })
    .await
}

/// Visit rows one at a time, sleeping `delay` between them.
async fn scrape_rows<T: fmt::Display>(
    rows: &[UrlRow],
    delay: Duration,
    mut scrape_one: impl AsyncFnMut(&UrlRow) -> T,
) -> Vec<T> {
    let total = rows.len();
    let mut out = Vec::with_capacity(total);

    for (i, row) in rows.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let record = scrape_one(row).await;
        log::info(&format!("[{}/{}] {}", i + 1, total, record));
        out.push(record);
    }
    out
}

/// Scrape `input` in chunks of `scrape.chunk_size` rows.
///
/// Chunk `n` (1-based) is written to `<prefix>_<n>.csv` as soon as it is
/// done. Chunks before `start_chunk` are skipped so an interrupted run can
/// resume. Finally every chunk on disk is merged into `all_<prefix>.csv`.
pub async fn run_scrape(
    browser: &dyn Browser,
    storage: &LocalStorage,
    config: &Config,
    kind: ScrapeKind,
    input: &str,
    prefix: &str,
    start_chunk: usize,
) -> Result<ScrapeSummary> {
    log::header(&format!("Scraping {kind}"));
    let start_time = Utc::now();

    let rows: Vec<UrlRow> = storage.read_csv(input).await?;
    let chunk_size = config.scrape.chunk_size.max(1);
    let chunks: Vec<&[UrlRow]> = rows.chunks(chunk_size).collect();
    let chunks_total = chunks.len();

    log::info(&format!(
        "Loaded {} rows from {} ({} chunks of {})",
        rows.len(),
        input,
        chunks_total,
        chunk_size
    ));

    let mut chunks_written = 0;
    let mut rows_scraped = 0;

    for (i, chunk) in chunks.into_iter().enumerate() {
        let n = i + 1;
        if n < start_chunk {
            log::debug(&format!("Skipping chunk {n}"));
            continue;
        }
        log::step(n, chunks_total, &format!("{} rows", chunk.len()));

        // The row delay also separates the last row of one chunk from the
        // first row of the next.
        let delay = config.pacing.row_delay();
        if chunks_written > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let key = LocalStorage::chunk_key(prefix, n);
        let meta = match kind {
            ScrapeKind::Posts => {
                let records = scrape_facebook_posts(browser, chunk, config).await;
                storage.write_csv(&key, &records).await?
            }
            ScrapeKind::Reels => {
                let records = scrape_facebook_reels(browser, chunk, config).await;
                storage.write_csv(&key, &records).await?
            }
            ScrapeKind::Tweets => {
                let records = scrape_tweets(browser, chunk, config).await;
                storage.write_csv(&key, &records).await?
            }
        };
        log::sub_item(&format!(
            "Saved {} at {}",
            meta.path.display(),
            meta.timestamp.format("%H:%M:%S")
        ));

        chunks_written += 1;
        rows_scraped += meta.rows;
    }

    let merged_rows = match kind {
        ScrapeKind::Posts | ScrapeKind::Reels => run_merge::<PostRecord>(storage, prefix).await?.len(),
        ScrapeKind::Tweets => run_merge::<TweetRecord>(storage, prefix).await?.len(),
    };

    let summary = ScrapeSummary {
        chunks_total,
        chunks_written,
        rows_scraped,
        merged_rows,
    };
    log::summary(
        &format!("Scraped {kind}"),
        &[
            ("Chunks written", format!("{chunks_written}/{chunks_total}")),
            ("Rows scraped", rows_scraped.to_string()),
            ("Merged rows", merged_rows.to_string()),
            (
                "Elapsed",
                format!("{}s", (Utc::now() - start_time).num_seconds()),
            ),
        ],
    );
    Ok(summary)
}

//! Pipeline entry points for scraper operations.
//!
//! - `run_classify`: Split Facebook URLs into videos and posts
//! - `run_ids`: Recover post ids, following share-link redirects
//! - `run_scrape`: Scrape posts, reels or tweets in resumable chunks
//! - `run_merge`, `run_clean`, `run_validate`: Post-process scraped records

pub mod classify;
pub mod clean;
pub mod ids;
pub mod scrape;

pub use classify::{Classified, classify_rows, run_classify};
pub use clean::{
    Alignment, CleanSummary, RowIdentity, check_alignment, run_clean, run_merge, run_validate,
    split_by_text, split_failures,
};
pub use ids::{extract_facebook_ids, run_ids};
pub use scrape::{
    ScrapeKind, ScrapeSummary, run_scrape, scrape_facebook_posts, scrape_facebook_reels,
    scrape_tweets,
};

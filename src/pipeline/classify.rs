// src/pipeline/classify.rs

//! Split collected Facebook URLs into videos and posts.

use crate::error::Result;
use crate::models::UrlRow;
use crate::storage::LocalStorage;
use crate::utils::log;
use crate::utils::url::{Platform, UrlKind, classify_url, detect_platform};

/// Rows split by what their URL points at, input order preserved.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Classified {
    pub videos: Vec<UrlRow>,
    pub posts: Vec<UrlRow>,
}

pub fn classify_rows(rows: &[UrlRow]) -> Classified {
    let mut out = Classified::default();
    for row in rows {
        match classify_url(&row.accounts) {
            UrlKind::Video => out.videos.push(row.clone()),
            UrlKind::Post => out.posts.push(row.clone()),
        }
    }
    out
}

/// Classify `input` and write the two halves next to it.
pub async fn run_classify(
    storage: &LocalStorage,
    input: &str,
    videos_key: &str,
    posts_key: &str,
) -> Result<Classified> {
    log::header("Classifying Facebook URLs");

    let rows: Vec<UrlRow> = storage.read_csv(input).await?;
    let foreign = rows
        .iter()
        .filter(|r| detect_platform(&r.accounts) != Platform::Facebook)
        .count();
    if foreign > 0 {
        log::warn(&format!("{foreign} rows are not Facebook URLs"));
    }

    let classified = classify_rows(&rows);
    storage.write_csv(videos_key, &classified.videos).await?;
    storage.write_csv(posts_key, &classified.posts).await?;

    log::summary(
        "Classification",
        &[
            ("Rows", rows.len().to_string()),
            ("Videos", classified.videos.len().to_string()),
            ("Posts", classified.posts.len().to_string()),
        ],
    );
    Ok(classified)
}

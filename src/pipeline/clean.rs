// src/pipeline/clean.rs

//! Merging chunk files and sorting scraped records into usable and re-queue sets.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::models::{CleaningConfig, PostRecord, TweetRecord, UrlRow};
use crate::storage::LocalStorage;
use crate::utils::log;

/// Output rows that can be traced back to the input row they came from.
pub trait RowIdentity {
    fn source_url(&self) -> &str;
    fn news_id(&self) -> &str;
}

impl RowIdentity for PostRecord {
    fn source_url(&self) -> &str {
        &self.url
    }

    fn news_id(&self) -> &str {
        &self.news_id
    }
}

impl RowIdentity for TweetRecord {
    fn source_url(&self) -> &str {
        &self.tweet_link
    }

    fn news_id(&self) -> &str {
        &self.news_id
    }
}

/// Records split on whether a caption was captured.
#[derive(Debug, Default)]
pub struct TextSplit {
    pub with_text: Vec<PostRecord>,
    pub no_text: Vec<PostRecord>,
    /// Subset of `no_text` that still has counts, usually image-only posts
    pub no_text_with_engagement: Vec<PostRecord>,
}

pub fn split_by_text(records: &[PostRecord]) -> TextSplit {
    let mut split = TextSplit::default();
    for record in records {
        if record.has_text() {
            split.with_text.push(record.clone());
        } else {
            if record.has_engagement() {
                split.no_text_with_engagement.push(record.clone());
            }
            split.no_text.push(record.clone());
        }
    }
    split
}

/// Records whose "caption" is really an error or fact-check banner.
#[derive(Debug, Default)]
pub struct FailureSplit {
    /// Everything except technical errors. Fact-checked records stay here too.
    pub kept: Vec<PostRecord>,
    pub technical_errors: Vec<UrlRow>,
    pub fact_checked: Vec<UrlRow>,
}

pub fn split_failures(records: &[PostRecord], cleaning: &CleaningConfig) -> FailureSplit {
    let mut split = FailureSplit::default();
    for record in records {
        match record.text.as_deref() {
            Some(t) if t == cleaning.technical_error_text => {
                split.technical_errors.push(record.to_row());
            }
            Some(t) if t == cleaning.fact_check_text => {
                split.fact_checked.push(record.to_row());
                split.kept.push(record.clone());
            }
            _ => split.kept.push(record.clone()),
        }
    }
    split
}

/// How well merged output lines up with its input, row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub output_rows: usize,
    pub input_rows: usize,
    pub url_matches: usize,
    pub news_id_matches: usize,
}

impl Alignment {
    /// Every input row produced exactly one output row, in order.
    pub fn is_aligned(&self) -> bool {
        self.output_rows == self.input_rows
            && self.url_matches == self.input_rows
            && self.news_id_matches == self.input_rows
    }
}

pub fn check_alignment<T: RowIdentity>(output: &[T], input: &[UrlRow]) -> Alignment {
    let pairs = || output.iter().zip(input);
    Alignment {
        output_rows: output.len(),
        input_rows: input.len(),
        url_matches: pairs().filter(|(o, i)| o.source_url() == i.accounts).count(),
        news_id_matches: pairs().filter(|(o, i)| o.news_id() == i.news_id).count(),
    }
}

/// Concatenate every chunk file of `prefix` in chunk order into the merged file.
pub async fn run_merge<T>(storage: &LocalStorage, prefix: &str) -> Result<Vec<T>>
where
    T: Serialize + DeserializeOwned,
{
    let chunks = storage.list_chunks(prefix).await?;
    let mut merged = Vec::new();
    for n in &chunks {
        let mut rows: Vec<T> = storage.read_csv(&LocalStorage::chunk_key(prefix, *n)).await?;
        merged.append(&mut rows);
    }

    let meta = storage
        .write_csv(&LocalStorage::merged_key(prefix), &merged)
        .await?;
    log::success(&format!(
        "Merged {} chunks ({} rows) into {}",
        chunks.len(),
        meta.rows,
        meta.path.display()
    ));
    Ok(merged)
}

/// Compare a merged output file against the input it was scraped from.
pub async fn run_validate<T>(storage: &LocalStorage, output: &str, input: &str) -> Result<Alignment>
where
    T: RowIdentity + DeserializeOwned,
{
    let records: Vec<T> = storage.read_csv(output).await?;
    let rows: Vec<UrlRow> = storage.read_csv(input).await?;
    let alignment = check_alignment(&records, &rows);

    log::summary(
        "Alignment",
        &[
            ("Output rows", alignment.output_rows.to_string()),
            ("Input rows", alignment.input_rows.to_string()),
            ("URL matches", alignment.url_matches.to_string()),
            ("news_id matches", alignment.news_id_matches.to_string()),
        ],
    );
    if !alignment.is_aligned() {
        log::warn("Output is not aligned with its input");
    }
    Ok(alignment)
}

/// Counts of what `run_clean` wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSummary {
    pub with_text: usize,
    pub no_text: usize,
    pub no_text_with_engagement: usize,
    pub technical_errors: usize,
    pub fact_checked: usize,
}

/// Sort a merged post file into sibling files named after `stem`.
///
/// Banner records go to `<stem>_technical_error.csv` and
/// `<stem>_fact_check.csv` as input rows ready to scrape again. Everything but
/// the technical errors is then split into `<stem>_with_text.csv`, `<stem>_no_text.csv` and
/// `<stem>_no_text_with_engagement.csv`.
pub async fn run_clean(
    storage: &LocalStorage,
    input: &str,
    stem: &str,
    cleaning: &CleaningConfig,
) -> Result<CleanSummary> {
    log::header("Cleaning scraped posts");

    let records: Vec<PostRecord> = storage.read_csv(input).await?;
    let failures = split_failures(&records, cleaning);
    let text = split_by_text(&failures.kept);

    storage
        .write_csv(&format!("{stem}_technical_error.csv"), &failures.technical_errors)
        .await?;
    storage
        .write_csv(&format!("{stem}_fact_check.csv"), &failures.fact_checked)
        .await?;
    storage
        .write_csv(&format!("{stem}_with_text.csv"), &text.with_text)
        .await?;
    storage
        .write_csv(&format!("{stem}_no_text.csv"), &text.no_text)
        .await?;
    storage
        .write_csv(
            &format!("{stem}_no_text_with_engagement.csv"),
            &text.no_text_with_engagement,
        )
        .await?;

    let summary = CleanSummary {
        with_text: text.with_text.len(),
        no_text: text.no_text.len(),
        no_text_with_engagement: text.no_text_with_engagement.len(),
        technical_errors: failures.technical_errors.len(),
        fact_checked: failures.fact_checked.len(),
    };
    log::summary(
        "Clean",
        &[
            ("Records", records.len().to_string()),
            ("With text", summary.with_text.to_string()),
            ("No text", summary.no_text.to_string()),
            ("No text, with counts", summary.no_text_with_engagement.to_string()),
            ("Technical errors", summary.technical_errors.to_string()),
            ("Fact-checked", summary.fact_checked.to_string()),
        ],
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, text: Option<&str>, like: Option<u64>) -> PostRecord {
        PostRecord {
            news_id: id.to_string(),
            url: format!("https://www.facebook.com/p/{id}"),
            text: text.map(str::to_string),
            like,
            ..PostRecord::default()
        }
    }

    #[test]
    fn text_split_marks_image_only_posts() {
        let records = vec![
            record("1", Some("caption"), Some(3)),
            record("2", None, Some(10)),
            record("3", Some(""), None),
        ];
        let split = split_by_text(&records);
        assert_eq!(split.with_text.len(), 1);
        assert_eq!(split.no_text.len(), 2);
        assert_eq!(split.no_text_with_engagement, vec![records[1].clone()]);
    }

    #[test]
    fn banners_become_requeue_rows() {
        let cleaning = CleaningConfig::default();
        let records = vec![
            record("1", Some(&cleaning.technical_error_text), None),
            record("2", Some("real caption"), None),
            record("3", Some(&cleaning.fact_check_text), Some(4)),
        ];

        let split = split_failures(&records, &cleaning);
        assert_eq!(split.kept, vec![records[1].clone(), records[2].clone()]);
        assert_eq!(
            split.technical_errors,
            vec![UrlRow::new("https://www.facebook.com/p/1", "1")]
        );
        assert_eq!(
            split.fact_checked,
            vec![UrlRow::new("https://www.facebook.com/p/3", "3")]
        );
    }

    #[test]
    fn banner_match_is_exact() {
        let cleaning = CleaningConfig::default();
        let padded = format!("{} ", cleaning.technical_error_text);
        let split = split_failures(&[record("1", Some(&padded), None)], &cleaning);
        assert_eq!(split.kept.len(), 1);
    }

    #[test]
    fn alignment_counts_positional_matches() {
        let output = vec![record("1", None, None), record("9", None, None)];
        let input = vec![
            UrlRow::new("https://www.facebook.com/p/1", "1"),
            UrlRow::new("https://www.facebook.com/p/2", "2"),
            UrlRow::new("https://www.facebook.com/p/3", "3"),
        ];

        let alignment = check_alignment(&output, &input);
        assert_eq!(
            alignment,
            Alignment {
                output_rows: 2,
                input_rows: 3,
                url_matches: 1,
                news_id_matches: 1,
            }
        );
        assert!(!alignment.is_aligned());
        assert!(check_alignment(&output[..1], &input[..1]).is_aligned());
    }

    #[tokio::test]
    async fn fact_checked_posts_are_requeued_and_kept() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let cleaning = CleaningConfig::default();

        let records = vec![
            record("1", Some(&cleaning.fact_check_text), Some(7)),
            record("2", Some(&cleaning.technical_error_text), None),
        ];
        storage.write_csv("all.csv", &records).await.unwrap();

        let summary = run_clean(&storage, "all.csv", "posts", &cleaning).await.unwrap();
        assert_eq!(summary.fact_checked, 1);
        assert_eq!(summary.technical_errors, 1);
        assert_eq!(summary.with_text, 1);

        let with_text: Vec<PostRecord> = storage.read_csv("posts_with_text.csv").await.unwrap();
        assert_eq!(with_text, vec![records[0].clone()]);
        let requeue: Vec<UrlRow> = storage.read_csv("posts_fact_check.csv").await.unwrap();
        assert_eq!(requeue, vec![UrlRow::new("https://www.facebook.com/p/1", "1")]);
    }

    #[tokio::test]
    async fn merge_concatenates_chunks_in_order() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage
            .write_csv("FB_posts_info_2.csv", &[record("2", None, None)])
            .await
            .unwrap();
        storage
            .write_csv("FB_posts_info_1.csv", &[record("1", None, None)])
            .await
            .unwrap();

        let merged: Vec<PostRecord> = run_merge(&storage, "FB_posts_info").await.unwrap();
        assert_eq!(merged.iter().map(|r| r.news_id.as_str()).collect::<Vec<_>>(), ["1", "2"]);

        let on_disk: Vec<PostRecord> = storage.read_csv("all_FB_posts_info.csv").await.unwrap();
        assert_eq!(on_disk, merged);
    }

    #[tokio::test]
    async fn clean_writes_every_split() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let cleaning = CleaningConfig::default();

        let records = vec![
            record("1", Some(&cleaning.technical_error_text), None),
            record("2", Some("caption"), None),
            record("3", None, Some(5)),
        ];
        storage.write_csv("all.csv", &records).await.unwrap();

        let summary = run_clean(&storage, "all.csv", "posts", &cleaning).await.unwrap();
        assert_eq!(
            summary,
            CleanSummary {
                with_text: 1,
                no_text: 1,
                no_text_with_engagement: 1,
                technical_errors: 1,
                fact_checked: 0,
            }
        );

        let requeue: Vec<UrlRow> = storage.read_csv("posts_technical_error.csv").await.unwrap();
        assert_eq!(requeue, vec![UrlRow::new("https://www.facebook.com/p/1", "1")]);
    }
}

//! Local filesystem storage implementation.
//!
//! Reads and writes CSV files under a root directory. Writes go to a
//! temporary file first and are renamed into place.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{BOM, WriteMetadata};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key. Absolute keys are used as is.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Key of chunk `n` (1-based) for `prefix`.
    pub fn chunk_key(prefix: &str, n: usize) -> String {
        format!("{prefix}_{n}.csv")
    }

    /// Key of the merged file for `prefix`.
    pub fn merged_key(prefix: &str) -> String {
        format!("all_{prefix}.csv")
    }

    /// Chunk numbers present on disk for `prefix`, ascending.
    pub async fn list_chunks(&self, prefix: &str) -> Result<Vec<usize>> {
        let head = format!("{prefix}_");
        let mut found = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(AppError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let n = name
                .strip_prefix(&head)
                .and_then(|rest| rest.strip_suffix(".csv"))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(n) = n {
                found.push(n);
            }
        }

        found.sort_unstable();
        Ok(found)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read every row of a CSV file. Missing files are an error.
    pub async fn read_csv<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let bytes = self.read_bytes(key).await?.ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", self.path(key).display()),
            ))
        })?;
        decode_csv(&bytes)
    }

    /// Write `rows` as a BOM-prefixed CSV file with a header line.
    pub async fn write_csv<T: Serialize>(&self, key: &str, rows: &[T]) -> Result<WriteMetadata> {
        let bytes = encode_csv(rows)?;
        let path = self.write_bytes(key, &bytes).await?;
        log::debug!("Wrote {} rows to {}", rows.len(), path.display());

        Ok(WriteMetadata {
            path,
            rows: rows.len(),
            timestamp: Utc::now(),
        })
    }
}

fn decode_csv<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let body = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body);

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn encode_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(BOM.to_vec());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Io(std::io::Error::other(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostRecord, UrlRow};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read_rows() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let rows = vec![
            UrlRow::new("https://www.facebook.com/reel/994171912430118", "1"),
            UrlRow::new("https://www.facebook.com/photo/?fbid=4821", "2"),
        ];
        let before = Utc::now();
        let meta = storage.write_csv("urls.csv", &rows).await.unwrap();
        assert_eq!(meta.rows, 2);
        assert_eq!(meta.path, tmp.path().join("urls.csv"));
        assert!(meta.timestamp >= before && meta.timestamp <= Utc::now());

        let loaded: Vec<UrlRow> = storage.read_csv("urls.csv").await.unwrap();
        assert_eq!(loaded, rows);
    }

    #[tokio::test]
    async fn test_file_starts_with_bom_and_header() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage
            .write_csv("posts.csv", &[PostRecord::default()])
            .await
            .unwrap();

        let bytes = std::fs::read(tmp.path().join("posts.csv")).unwrap();
        assert!(bytes.starts_with(BOM));
        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with(
            "news_id,url,text,like,comments,shares,username,profile_url,image_src\n"
        ));
    }

    #[tokio::test]
    async fn test_null_counts_survive_as_empty_fields() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let record = PostRecord {
            news_id: "8".to_string(),
            url: "https://www.facebook.com/x/posts/pfbid02abc".to_string(),
            text: Some("نص، مع فاصلة".to_string()),
            like: Some(1200),
            ..PostRecord::default()
        };
        storage.write_csv("one.csv", &[record.clone()]).await.unwrap();

        let loaded: Vec<PostRecord> = storage.read_csv("one.csv").await.unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[tokio::test]
    async fn test_reads_file_without_bom_and_extra_columns() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("in.csv"),
            "accounts,news_id,source\nhttps://x.com/a/status/1,5,sheet\n",
        )
        .unwrap();
        let storage = LocalStorage::new(tmp.path());

        let rows: Vec<UrlRow> = storage.read_csv("in.csv").await.unwrap();
        assert_eq!(rows, vec![UrlRow::new("https://x.com/a/status/1", "5")]);
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.read_csv::<UrlRow>("nope.csv").await.is_err());
    }

    #[tokio::test]
    async fn test_list_chunks_in_numeric_order() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let empty: [UrlRow; 0] = [];

        for key in ["FB_posts_info_10.csv", "FB_posts_info_2.csv", "FB_posts_info_1.csv"] {
            storage.write_csv(key, &empty).await.unwrap();
        }
        storage.write_csv("all_FB_posts_info.csv", &empty).await.unwrap();
        storage.write_csv("FB_posts_info_x.csv", &empty).await.unwrap();

        assert_eq!(storage.list_chunks("FB_posts_info").await.unwrap(), vec![1, 2, 10]);
    }

    #[test]
    fn test_chunk_and_merged_keys() {
        assert_eq!(LocalStorage::chunk_key("Twitter_info", 4), "Twitter_info_4.csv");
        assert_eq!(LocalStorage::merged_key("Twitter_info"), "all_Twitter_info.csv");
    }
}

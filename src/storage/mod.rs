//! Storage for row and record files.
//!
//! Every file is CSV, UTF-8 with a byte-order mark so spreadsheets open
//! Arabic text correctly. Scrape runs write one file per chunk and a merged
//! file at the end:
//!
//! ```text
//! {root}/
//! ├── FB_posts_info_1.csv       # chunk 1
//! ├── FB_posts_info_2.csv       # chunk 2
//! └── all_FB_posts_info.csv     # merged
//! ```

pub mod local;

use std::path::PathBuf;

use chrono::{DateTime, Utc};

// Re-export for convenience
pub use local::LocalStorage;

/// UTF-8 byte-order mark written at the start of every file.
pub const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Where the file ended up
    pub path: PathBuf,
    /// Number of data rows, header excluded
    pub rows: usize,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

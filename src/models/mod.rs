// src/models/mod.rs

//! Domain models for the scraper.
//!
//! Configuration, input rows and the flat per-row output records.

mod config;
mod record;

// Re-export all public types
pub use config::{
    BrowserConfig, CleaningConfig, Config, PacingConfig, ResolverConfig, ScrapeConfig,
};
pub use record::{FacebookId, IdKind, NAVIGATION_ERROR, PostRecord, TweetRecord, UrlRow};

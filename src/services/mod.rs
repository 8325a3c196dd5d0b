//! Service layer for the scraper.
//!
//! This module contains:
//! - The live browser seam (`Browser`, `WebDriverBrowser`)
//! - Overlay handling shared by the Facebook flows
//! - Page parsers for Facebook posts, Facebook reels and tweets

pub mod browser;
pub mod facebook_post;
pub mod facebook_reel;
pub mod overlays;
pub mod twitter;

pub use browser::{Browser, WebDriverBrowser};

// src/lib.rs

//! Post metadata scraper for Facebook and Twitter/X.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

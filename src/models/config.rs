//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// WebDriver session settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Sleeps and waits between page interactions
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Extraction and output behavior
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// HTTP redirect resolution for Facebook ids
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Sentences that mark a row for re-scraping
    #[serde(default)]
    pub cleaning: CleaningConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.browser.webdriver_url.trim().is_empty() {
            return Err(AppError::validation("browser.webdriver_url is empty"));
        }
        url::Url::parse(&self.browser.webdriver_url)?;
        if self.pacing.wait_long_secs == 0 || self.pacing.wait_short_secs == 0 {
            return Err(AppError::validation("pacing waits must be > 0"));
        }
        if self.pacing.poll_ms == 0 {
            return Err(AppError::validation("pacing.poll_ms must be > 0"));
        }
        if self.scrape.chunk_size == 0 {
            return Err(AppError::validation("scrape.chunk_size must be > 0"));
        }
        url::Url::parse(&self.scrape.facebook_base)?;
        if self.resolver.user_agent.trim().is_empty() {
            return Err(AppError::validation("resolver.user_agent is empty"));
        }
        if self.resolver.timeout_secs == 0 {
            return Err(AppError::validation("resolver.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// WebDriver session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Address of the running chromedriver (or compatible) server
    #[serde(default = "defaults::webdriver_url")]
    pub webdriver_url: String,

    /// Browser binary, e.g. a Brave install; driver default when unset
    #[serde(default)]
    pub binary: Option<String>,

    /// Profile root holding a logged-in session
    #[serde(default)]
    pub user_data_dir: Option<String>,

    /// Profile directory name inside `user_data_dir`
    #[serde(default = "defaults::profile_directory")]
    pub profile_directory: String,

    #[serde(default)]
    pub headless: bool,

    /// Additional command-line switches passed to the browser
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: defaults::webdriver_url(),
            binary: None,
            user_data_dir: None,
            profile_directory: defaults::profile_directory(),
            headless: false,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Command-line switches for the browser process.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(dir) = &self.user_data_dir {
            args.push(format!("--user-data-dir={dir}"));
            args.push(format!("--profile-directory={}", self.profile_directory));
        }
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Fixed sleeps and explicit waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause between rows
    #[serde(default = "defaults::row_delay")]
    pub row_delay_secs: u64,

    /// Pause after navigating to a tweet before querying the page
    #[serde(default = "defaults::settle")]
    pub settle_ms: u64,

    #[serde(default = "defaults::wait_short")]
    pub wait_short_secs: u64,

    #[serde(default = "defaults::wait_long")]
    pub wait_long_secs: u64,

    /// Wait for each fact-check overlay button
    #[serde(default = "defaults::factcheck_timeout")]
    pub factcheck_timeout_secs: u64,

    /// Wait for the post caption container to appear
    #[serde(default = "defaults::caption_wait")]
    pub caption_wait_secs: u64,

    /// Wait for the "See more" control to become clickable
    #[serde(default = "defaults::see_more_timeout")]
    pub see_more_timeout_secs: u64,

    /// Pause after expanding a caption
    #[serde(default = "defaults::expand_pause")]
    pub expand_pause_ms: u64,

    /// Wait for the reel page main region
    #[serde(default = "defaults::main_wait")]
    pub main_wait_secs: u64,

    /// Poll interval for explicit waits
    #[serde(default = "defaults::poll")]
    pub poll_ms: u64,

    /// Time a throwaway tab gets to follow a share link's redirects
    #[serde(default = "defaults::tab_settle")]
    pub tab_settle_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            row_delay_secs: defaults::row_delay(),
            settle_ms: defaults::settle(),
            wait_short_secs: defaults::wait_short(),
            wait_long_secs: defaults::wait_long(),
            factcheck_timeout_secs: defaults::factcheck_timeout(),
            caption_wait_secs: defaults::caption_wait(),
            see_more_timeout_secs: defaults::see_more_timeout(),
            expand_pause_ms: defaults::expand_pause(),
            main_wait_secs: defaults::main_wait(),
            poll_ms: defaults::poll(),
            tab_settle_ms: defaults::tab_settle(),
        }
    }
}

impl PacingConfig {
    pub fn row_delay(&self) -> Duration {
        Duration::from_secs(self.row_delay_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn wait_short(&self) -> Duration {
        Duration::from_secs(self.wait_short_secs)
    }

    pub fn wait_long(&self) -> Duration {
        Duration::from_secs(self.wait_long_secs)
    }

    pub fn factcheck_timeout(&self) -> Duration {
        Duration::from_secs(self.factcheck_timeout_secs)
    }

    pub fn caption_wait(&self) -> Duration {
        Duration::from_secs(self.caption_wait_secs)
    }

    pub fn see_more_timeout(&self) -> Duration {
        Duration::from_secs(self.see_more_timeout_secs)
    }

    pub fn expand_pause(&self) -> Duration {
        Duration::from_millis(self.expand_pause_ms)
    }

    pub fn main_wait(&self) -> Duration {
        Duration::from_secs(self.main_wait_secs)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn tab_settle(&self) -> Duration {
        Duration::from_millis(self.tab_settle_ms)
    }

    /// Pacing with every sleep and wait collapsed, for offline runs.
    pub fn immediate() -> Self {
        Self {
            row_delay_secs: 0,
            settle_ms: 0,
            wait_short_secs: 1,
            wait_long_secs: 1,
            factcheck_timeout_secs: 0,
            caption_wait_secs: 0,
            see_more_timeout_secs: 0,
            expand_pause_ms: 0,
            main_wait_secs: 0,
            poll_ms: 1,
            tab_settle_ms: 0,
        }
    }
}

/// Extraction and output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Rows per chunk file
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,

    /// Preferred `lang` attribute when picking the tweet text node
    #[serde(default = "defaults::tweet_lang")]
    pub tweet_lang: String,

    /// Base for site-relative Facebook profile links
    #[serde(default = "defaults::facebook_base")]
    pub facebook_base: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::chunk_size(),
            tweet_lang: defaults::tweet_lang(),
            facebook_base: defaults::facebook_base(),
        }
    }
}

/// HTTP redirect resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::resolver_timeout")]
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::resolver_timeout(),
        }
    }
}

/// Page texts that indicate the scrape captured an error screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    #[serde(default = "defaults::technical_error_text")]
    pub technical_error_text: String,

    #[serde(default = "defaults::fact_check_text")]
    pub fact_check_text: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            technical_error_text: defaults::technical_error_text(),
            fact_check_text: defaults::fact_check_text(),
        }
    }
}

mod defaults {
    // Browser defaults
    pub fn webdriver_url() -> String {
        "http://localhost:9515".into()
    }
    pub fn profile_directory() -> String {
        "Profile 1".into()
    }

    // Pacing defaults
    pub fn row_delay() -> u64 {
        5
    }
    pub fn settle() -> u64 {
        1000
    }
    pub fn wait_short() -> u64 {
        10
    }
    pub fn wait_long() -> u64 {
        20
    }
    pub fn factcheck_timeout() -> u64 {
        3
    }
    pub fn caption_wait() -> u64 {
        5
    }
    pub fn see_more_timeout() -> u64 {
        3
    }
    pub fn expand_pause() -> u64 {
        2000
    }
    pub fn main_wait() -> u64 {
        30
    }
    pub fn poll() -> u64 {
        250
    }
    pub fn tab_settle() -> u64 {
        3000
    }

    // Scrape defaults
    pub fn chunk_size() -> usize {
        20
    }
    pub fn tweet_lang() -> String {
        "ar".into()
    }
    pub fn facebook_base() -> String {
        "https://www.facebook.com".into()
    }

    // Resolver defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".into()
    }
    pub fn resolver_timeout() -> u64 {
        10
    }

    // Cleaning defaults
    pub fn technical_error_text() -> String {
        "This may be because of a technical error that we're working to fix. Please try reloading this page.".into()
    }
    pub fn fact_check_text() -> String {
        "Partly false. Reviewed by third-party fact-checkers.".into()
    }
}

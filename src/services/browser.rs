// src/services/browser.rs

//! Live browser session.
//!
//! Page parsers only ever see rendered page source. Everything that has to
//! touch the live page (navigation, clicks, waits, throwaway tabs) goes
//! through [`Browser`], implemented for a WebDriver session by
//! [`WebDriverBrowser`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thirtyfour::prelude::*;

use crate::error::Result;
use crate::models::BrowserConfig;

/// The browser operations the scrapers rely on.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate the current tab to `url`.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Rendered source of the current page.
    async fn source(&self) -> Result<String>;

    /// URL of the current page after redirects.
    async fn current_url(&self) -> Result<String>;

    /// Wait up to `timeout` for `xpath` to be present.
    async fn wait_for(&self, xpath: &str, timeout: Duration) -> Result<bool>;

    /// Wait up to `timeout` for `xpath` to be clickable, then click it via script.
    ///
    /// Returns `false` when nothing clickable showed up in time.
    async fn click_when_ready(&self, xpath: &str, timeout: Duration) -> Result<bool>;

    /// Open `url` in a new tab, let redirects settle, report where it landed,
    /// and close the tab again.
    async fn resolve_in_tab(&self, url: &str, settle: Duration) -> Result<Option<String>>;
}

/// [`Browser`] backed by a WebDriver (chromedriver) session.
pub struct WebDriverBrowser {
    driver: WebDriver,
    poll: Duration,
}

impl WebDriverBrowser {
    /// Start a session on the configured WebDriver server.
    pub async fn connect(config: &BrowserConfig, poll: Duration) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_chrome_option("args", config.args())?;
        if let Some(binary) = &config.binary {
            caps.add_chrome_option("binary", binary)?;
        }

        log::info!("Connecting to WebDriver at {}", config.webdriver_url);
        let driver = WebDriver::new(&config.webdriver_url, caps).await?;
        Ok(Self { driver, poll })
    }

    /// End the session and close the browser.
    pub async fn quit(self) -> Result<()> {
        self.driver.quit().await?;
        Ok(())
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn source(&self) -> Result<String> {
        Ok(self.driver.source().await?)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn wait_for(&self, xpath: &str, timeout: Duration) -> Result<bool> {
        let found = self
            .driver
            .query(By::XPath(xpath))
            .wait(timeout, self.poll)
            .first()
            .await;
        Ok(found.is_ok())
    }

    async fn click_when_ready(&self, xpath: &str, timeout: Duration) -> Result<bool> {
        let found = self
            .driver
            .query(By::XPath(xpath))
            .wait(timeout, self.poll)
            .and_clickable()
            .first()
            .await;

        let element = match found {
            Ok(element) => element,
            Err(e) => {
                log::debug!("No clickable element for {xpath}: {e}");
                return Ok(false);
            }
        };

        self.driver
            .execute("arguments[0].click();", vec![element.to_json()?])
            .await?;
        Ok(true)
    }

    async fn resolve_in_tab(&self, url: &str, settle: Duration) -> Result<Option<String>> {
        let original = self.driver.window().await?;
        let before = self.driver.windows().await?;

        self.driver
            .execute("window.open(arguments[0], '_blank');", vec![json!(url)])
            .await?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let after = self.driver.windows().await?;
        let Some(tab) = after.into_iter().find(|h| !before.contains(h)) else {
            return Ok(None);
        };

        self.driver.switch_to_window(tab).await?;
        tokio::time::sleep(settle).await;
        let landed = self.driver.current_url().await.map(|u| u.to_string());

        if let Err(e) = self.driver.close_window().await {
            log::debug!("Closing resolver tab failed: {e}");
        }
        self.driver.switch_to_window(original).await?;

        Ok(landed.ok())
    }
}

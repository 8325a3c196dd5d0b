// src/services/overlays.rs

//! Interstitials that cover a post until dismissed.

use std::time::Duration;

use crate::services::Browser;

pub const SEE_WHY: &str = "//*[normalize-space()='See why' and @role='button']";
pub const SEE_POST_ANYWAY: &str = "//*[normalize-space()='See post anyway' and @role='button']";
pub const REMOVE_CROSS: &str = "//div[@role='button' and @aria-label='Remove']";
pub const SEE_MORE: &str = "//div[@role='button' and normalize-space()='See more'] | //div[text()='See more']";

/// Click through a fact-check overlay and close the "Remove" banner.
///
/// Every step is optional; pages without an overlay pass straight through.
pub async fn bypass_factcheck(browser: &dyn Browser, timeout: Duration) {
    if click(browser, SEE_WHY, timeout).await && click(browser, SEE_POST_ANYWAY, timeout).await {
        log::info!("Bypassed fact-check overlay.");
    }
    click(browser, REMOVE_CROSS, timeout).await;
}

/// Expand a truncated caption and give it `pause` to re-render.
pub async fn expand_see_more(browser: &dyn Browser, timeout: Duration, pause: Duration) -> bool {
    let clicked = click(browser, SEE_MORE, timeout).await;
    if clicked && !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
    clicked
}

async fn click(browser: &dyn Browser, xpath: &str, timeout: Duration) -> bool {
    match browser.click_when_ready(xpath, timeout).await {
        Ok(clicked) => clicked,
        Err(e) => {
            log::debug!("Click on {xpath} failed: {e}");
            false
        }
    }
}

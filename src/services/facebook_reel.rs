// src/services/facebook_reel.rs

//! Facebook reel and video page parser.

use std::collections::HashSet;

use scraper::{ElementRef, Html};

use crate::models::{Config, PostRecord, UrlRow};
use crate::services::{Browser, overlays};
use crate::utils::dom;
use crate::utils::numbers::parse_count;
use crate::utils::resolve;

/// Places a reel caption has been seen, most specific first.
const CAPTION_CANDIDATES: [&str; 9] = [
    "div[data-ad-preview='message']",
    "div[data-ad-comet-preview='message']",
    "[data-ad-preview='message']",
    "div[role='article'] div[dir='auto']",
    "div[role='article'] span[dir='auto']",
    "[role='main'] div[dir='auto']",
    "[role='main'] span[dir='auto']",
    "[data-pagelet*='Reel'] div[dir='auto']",
    "[data-pagelet*='Reel'] span[dir='auto']",
];

/// Words that mark a short text block as player chrome rather than caption.
const UI_NOISE: [&str; 6] = ["like", "comment", "share", "follow", "subscriptions", "volgen"];

const MIN_CAPTION_LEN: usize = 5;
const NOISE_LEN_LIMIT: usize = 40;

const MAIN_XPATH: &str = "//div[@role='main']";
const TEXT_XPATH: &str = "//div[@dir='auto']";

const PROFILE_HREF_HINTS: [&str; 3] = ["/profile.php", "/people/", "/pages/"];

/// Scrape one reel row.
pub async fn scrape(browser: &dyn Browser, row: &UrlRow, config: &Config) -> PostRecord {
    let pacing = &config.pacing;

    if let Err(e) = browser.goto(&row.accounts).await {
        log::warn!("Navigation failed for {}: {}", row.accounts, e);
        return PostRecord::navigation_failed(row);
    }

    overlays::bypass_factcheck(browser, pacing.factcheck_timeout()).await;

    let mounted = browser
        .wait_for(MAIN_XPATH, pacing.main_wait())
        .await
        .unwrap_or(false);
    if !mounted {
        log::debug!("No main region on {}, waiting for any text block", row.accounts);
        let _ = browser.wait_for(TEXT_XPATH, pacing.wait_short()).await;
    }

    overlays::expand_see_more(browser, pacing.see_more_timeout(), pacing.expand_pause()).await;

    match browser.source().await {
        Ok(html) => extract_reel(&Html::parse_document(&html), &config.scrape.facebook_base, row),
        Err(e) => {
            log::warn!("Could not read page source for {}: {}", row.accounts, e);
            PostRecord {
                news_id: row.news_id.clone(),
                url: row.accounts.clone(),
                ..PostRecord::default()
            }
        }
    }
}

/// Every field of a reel page. Reels carry no `image_src`.
pub fn extract_reel(document: &Html, facebook_base: &str, row: &UrlRow) -> PostRecord {
    let candidates = collect_caption_candidates(document);
    let caption = pick_best_caption(&candidates);
    let (like, comments, shares) = extract_counts(document);
    let (username, profile_url) = extract_poster(document, facebook_base);

    PostRecord {
        news_id: row.news_id.clone(),
        url: row.accounts.clone(),
        text: (!caption.is_empty()).then_some(caption),
        like,
        comments,
        shares,
        username,
        profile_url,
        image_src: None,
    }
}

/// Distinct visible texts from every caption candidate, in first-seen order.
pub fn collect_caption_candidates(document: &Html) -> Vec<String> {
    let mut seen = HashSet::new();
    CAPTION_CANDIDATES
        .iter()
        .flat_map(|css| dom::doc_all(document, css))
        .filter(|el| !dom::is_hidden(*el))
        .filter_map(dom::non_empty_text)
        .filter(|text| seen.insert(text.clone()))
        .collect()
}

/// The most plausible main caption among `candidates`.
///
/// Short fragments and short blocks mentioning player controls are dropped;
/// the longest survivor wins. Lengths are counted in chars throughout. If nothing survives, the longest candidate wins.
pub fn pick_best_caption(candidates: &[String]) -> String {
    let filtered: Vec<&str> = candidates
        .iter()
        .map(|c| c.trim())
        .filter(|plain| {
            let len = plain.chars().count();
            if len < MIN_CAPTION_LEN {
                return false;
            }
            let low = plain.to_lowercase();
            !(len < NOISE_LEN_LIMIT && UI_NOISE.iter().any(|w| low.contains(w)))
        })
        .collect();

    let pool: Vec<&str> = if filtered.is_empty() {
        candidates.iter().map(|c| c.trim()).collect()
    } else {
        filtered
    };

    pool.into_iter()
        .fold(None::<&str>, |best, c| match best {
            Some(b) if b.chars().count() >= c.chars().count() => Some(b),
            _ => Some(c),
        })
        .unwrap_or_default()
        .to_string()
}

/// `(likes, comments, shares)` from the reel's action buttons.
pub fn extract_counts(document: &Html) -> (Option<u64>, Option<u64>, Option<u64>) {
    let buttons = dom::doc_all(document, "div[role='button'][aria-label]");
    let metric = |token: &str| {
        buttons
            .iter()
            .find(|b| dom::attr_contains_ci(**b, "aria-label", token))
            .and_then(|b| last_span_count(*b))
    };
    (metric("like"), metric("comment"), metric("share"))
}

/// `(name, profile_url)` of whoever posted the reel.
pub fn extract_poster(document: &Html, facebook_base: &str) -> (Option<String>, Option<String>) {
    let candidates: [fn(&Html) -> Option<ElementRef<'_>>; 4] =
        [header_role_link, header_link, profile_like_link, owner_profile_link];

    // A named link wins; otherwise keep the last link that matched at all.
    let mut link = None;
    for candidate in &candidates {
        if let Some(found) = candidate(document) {
            let named = dom::non_empty_text(found).is_some();
            link = Some(found);
            if named {
                break;
            }
        }
    }

    let Some(link) = link else {
        return (None, None);
    };

    let name = dom::non_empty_text(link);
    let href = dom::attr(link, "href").map(|h| resolve(facebook_base, &h));
    (name, href)
}

fn header_role_link(document: &Html) -> Option<ElementRef<'_>> {
    dom::doc_first(document, "h2 a[role='link'][href]")
}

fn header_link(document: &Html) -> Option<ElementRef<'_>> {
    dom::doc_first(document, "h2 a[href]")
}

fn profile_like_link(document: &Html) -> Option<ElementRef<'_>> {
    dom::doc_all(document, "a[role='link'][href]")
        .into_iter()
        .find(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| PROFILE_HREF_HINTS.iter().any(|h| href.contains(h)))
        })
}

fn owner_profile_link(document: &Html) -> Option<ElementRef<'_>> {
    dom::doc_all(document, "a[role='link'][aria-label]")
        .into_iter()
        .find(|a| dom::attr_contains_ci(*a, "aria-label", "owner profile"))
}

fn last_span_count(button: ElementRef<'_>) -> Option<u64> {
    let text = dom::all(button, "span")
        .into_iter()
        .filter_map(dom::non_empty_text)
        .last()?;
    parse_count(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NAVIGATION_ERROR, PacingConfig};
    use crate::services::browser::fake::FakeBrowser;
    use crate::services::overlays::SEE_MORE;

    const REEL_URL: &str = "https://www.facebook.com/reel/994171912430118";

    const FACEBOOK: &str = "https://www.facebook.com";

    const REEL_PAGE: &str = r#"
        <html><body>
        <div role="main">
          <div data-pagelet="ReelsPlayer">
            <h2><a role="link" href="/profile.php?id=61551757785646">Beam News</a></h2>
            <div dir="auto">Follow</div>
            <div dir="auto">فيديو يظهر لحظة انهيار الجسر في المدينة القديمة</div>
            <div dir="auto" style="display: none">hidden caption that is longer than every other one</div>
            <div role="button" aria-label="Like"><span><i></i></span><span>1.2K</span></div>
            <div role="button" aria-label="Comment"><span>٣٤٥</span></div>
            <div role="button" aria-label="Share"><span></span><span>3,456</span></div>
          </div>
        </div>
        </body></html>
    "#;

    fn row() -> UrlRow {
        UrlRow::new(REEL_URL, "7")
    }

    fn config() -> Config {
        Config {
            pacing: PacingConfig::immediate(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn flow_waits_for_main_region_then_expands() {
        let browser = FakeBrowser::new()
            .with_page(REEL_URL, REEL_PAGE)
            .with_present(MAIN_XPATH)
            .with_clickable(SEE_MORE);

        let record = scrape(&browser, &row(), &config()).await;

        assert_eq!(browser.visited(), vec![REEL_URL]);
        assert_eq!(browser.waited(), vec![MAIN_XPATH]);
        assert_eq!(browser.clicked(), vec![SEE_MORE]);
        assert_eq!(
            record.text.as_deref(),
            Some("فيديو يظهر لحظة انهيار الجسر في المدينة القديمة")
        );
        assert_eq!(record.news_id, "7");
    }

    #[tokio::test]
    async fn flow_falls_back_to_any_text_block() {
        let browser = FakeBrowser::new().with_page(REEL_URL, REEL_PAGE);

        let record = scrape(&browser, &row(), &config()).await;

        assert_eq!(browser.waited(), vec![MAIN_XPATH, TEXT_XPATH]);
        assert_eq!(record.like, Some(1200));
    }

    #[tokio::test]
    async fn failed_navigation_gives_the_sentinel() {
        let browser = FakeBrowser::new();

        let record = scrape(&browser, &row(), &config()).await;

        assert_eq!(record.text.as_deref(), Some(NAVIGATION_ERROR));
        assert!(browser.waited().is_empty());
    }

    #[tokio::test]
    async fn unreadable_source_gives_an_empty_record() {
        let browser = FakeBrowser::new()
            .with_page(REEL_URL, REEL_PAGE)
            .with_broken_source();

        let record = scrape(&browser, &row(), &config()).await;

        assert_eq!(
            record,
            PostRecord {
                news_id: "7".to_string(),
                url: REEL_URL.to_string(),
                ..PostRecord::default()
            }
        );
    }

    #[test]
    fn extracts_full_reel() {
        let doc = Html::parse_document(REEL_PAGE);
        let record = extract_reel(&doc, FACEBOOK, &row());

        assert_eq!(
            record.text.as_deref(),
            Some("فيديو يظهر لحظة انهيار الجسر في المدينة القديمة")
        );
        assert_eq!(record.like, Some(1200));
        assert_eq!(record.comments, Some(345));
        assert_eq!(record.shares, Some(3456));
        assert_eq!(record.username.as_deref(), Some("Beam News"));
        assert_eq!(
            record.profile_url.as_deref(),
            Some("https://www.facebook.com/profile.php?id=61551757785646")
        );
        assert_eq!(record.image_src, None);
    }

    #[test]
    fn candidates_are_distinct_and_visible() {
        let doc = Html::parse_document(REEL_PAGE);
        let candidates = collect_caption_candidates(&doc);
        assert_eq!(
            candidates
                .iter()
                .filter(|c| c.starts_with("فيديو"))
                .count(),
            1
        );
        assert!(!candidates.iter().any(|c| c.starts_with("hidden")));
    }

    #[test]
    fn best_caption_skips_short_and_noise() {
        let candidates = vec![
            "Hi".to_string(),
            "Like · Comment · Share".to_string(),
            "A real caption".to_string(),
        ];
        assert_eq!(pick_best_caption(&candidates), "A real caption");
    }

    #[test]
    fn long_text_with_noise_word_is_kept() {
        let long = "Please share this video with everyone you know today".to_string();
        let candidates = vec!["Short one".to_string(), long.clone()];
        assert_eq!(pick_best_caption(&candidates), long);
    }

    #[test]
    fn combining_marks_count_toward_caption_length() {
        // Four letters and three harakat: seven chars.
        let voweled = "\u{645}\u{64e}\u{631}\u{652}\u{62d}\u{64e}\u{628}".to_string();
        let candidates = vec![voweled.clone(), "Follow us".to_string()];
        assert_eq!(pick_best_caption(&candidates), voweled);
    }

    #[test]
    fn all_filtered_falls_back_to_every_candidate() {
        let candidates = vec!["Follow".to_string(), "ok".to_string()];
        assert_eq!(pick_best_caption(&candidates), "Follow");
    }

    #[test]
    fn no_candidates_is_empty() {
        assert_eq!(pick_best_caption(&[]), "");
    }

    #[test]
    fn poster_uses_profile_like_link_without_header() {
        let html = r#"
            <a role="link" href="/watch/">Watch</a>
            <a role="link" href="https://www.facebook.com/people/Someone/1000/">Someone</a>
        "#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_poster(&doc, FACEBOOK),
            (
                Some("Someone".to_string()),
                Some("https://www.facebook.com/people/Someone/1000/".to_string())
            )
        );
    }

    #[test]
    fn unnamed_header_link_is_replaced_by_later_candidate() {
        let html = r#"
            <h2><a role="link" href="/page.one"><img src="avatar.jpg"></a></h2>
            <a role="link" aria-label="See Owner Profile" href="/page.two">Page Two</a>
        "#;
        let doc = Html::parse_document(html);
        let (name, href) = extract_poster(&doc, FACEBOOK);
        assert_eq!(name.as_deref(), Some("Page Two"));
        assert_eq!(href.as_deref(), Some("https://www.facebook.com/page.two"));
    }

    #[test]
    fn unnamed_link_is_kept_when_nothing_better() {
        let html = r#"<h2><a role="link" href="/page.one"><img src="a.jpg"></a></h2>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_poster(&doc, FACEBOOK),
            (None, Some("https://www.facebook.com/page.one".to_string()))
        );
    }

    #[test]
    fn no_poster_link() {
        let doc = Html::parse_document("<div>nothing</div>");
        assert_eq!(extract_poster(&doc, FACEBOOK), (None, None));
    }

    #[test]
    fn missing_buttons_give_null_counts() {
        let doc = Html::parse_document("<div role='button' aria-label='Like'></div>");
        assert_eq!(extract_counts(&doc), (None, None, None));
    }

    #[test]
    fn selectors_parse() {
        for css in CAPTION_CANDIDATES {
            assert!(dom::parse_selector(css).is_ok(), "{css}");
        }
    }
}

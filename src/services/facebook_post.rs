// src/services/facebook_post.rs

//! Facebook post page parser.
//!
//! The post layout is class-obfuscated, so each field is located by the few
//! anchors that have stayed stable: ARIA labels on the reactions toolbar,
//! `data-visualcompletion` markers on icons and media, and a handful of
//! utility-class combinations.

use scraper::{ElementRef, Html};

use crate::models::{Config, PostRecord, UrlRow};
use crate::services::{Browser, overlays};
use crate::utils::dom;
use crate::utils::numbers::parse_count;
use crate::utils::resolve;

const CAPTION: &str = "div.xyinxu5.xyri2b.x1g2khh7.x1c1uobl";
const CAPTION_XPATH: &str = "//div[contains(@class,'xyinxu5') and contains(@class,'xyri2b') and contains(@class,'x1g2khh7') and contains(@class,'x1c1uobl')]";
const TOOLBAR_CANDIDATES: &str = "[role='toolbar'][aria-label], [role='group'][aria-label]";
const REACTED_LABEL: &str = "See who reacted to this";
const LIKES_SPAN: &str = "span[aria-label='See who reacted to this']";
const ENGAGEMENT_CONTAINER_CLASS: &str = "x1n2onr6";
const ICON: &str = "i[data-visualcompletion='css-img']";
const AUTHOR: &str = "div.xu06os2.x1ok221b";
const POST_IMAGE: &str = "img[data-visualcompletion='media-vc-image']";

/// Which side of a button's icon holds its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
}

/// Scrape one post row, returning nulls for whatever could not be found.
pub async fn scrape(browser: &dyn Browser, row: &UrlRow, config: &Config) -> PostRecord {
    let pacing = &config.pacing;

    if let Err(e) = browser.goto(&row.accounts).await {
        log::warn!("Navigation failed for {}: {}", row.accounts, e);
        return PostRecord::navigation_failed(row);
    }

    overlays::bypass_factcheck(browser, pacing.factcheck_timeout()).await;
    open_photo_dialog(browser).await;
    overlays::bypass_factcheck(browser, pacing.factcheck_timeout()).await;

    if browser
        .wait_for(CAPTION_XPATH, pacing.caption_wait())
        .await
        .unwrap_or(false)
    {
        overlays::expand_see_more(browser, pacing.see_more_timeout(), pacing.expand_pause())
            .await;
    }

    let page_url = browser
        .current_url()
        .await
        .unwrap_or_else(|_| row.accounts.clone());

    match browser.source().await {
        Ok(html) => extract_post(&Html::parse_document(&html), &page_url, row),
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

/// When the post opened as a photo dialog, navigate to the photo's own page.
///
/// Returns whether a navigation happened.
pub async fn open_photo_dialog(browser: &dyn Browser) -> bool {
    let Ok(html) = browser.source().await else {
        return false;
    };
    let page_url = browser.current_url().await.unwrap_or_default();
    let Some(target) = photo_dialog_target(&Html::parse_document(&html), &page_url) else {
        return false;
    };

    log::debug!("Opening photo dialog target {target}");
    match browser.goto(&target).await {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Photo dialog navigation failed: {e}");
            false
        }
    }
}

/// Every field of a post page.
pub fn extract_post(document: &Html, page_url: &str, row: &UrlRow) -> PostRecord {
    let (like, comments, shares) = extract_engagement(document);
    let (username, profile_url) = extract_author(document, page_url);

    PostRecord {
        news_id: row.news_id.clone(),
        url: row.accounts.clone(),
        text: extract_text(document),
        like,
        comments,
        shares,
        username,
        profile_url,
        image_src: extract_image_src(document),
    }
}

/// Caption text of the post.
pub fn extract_text(document: &Html) -> Option<String> {
    dom::doc_first(document, CAPTION).and_then(dom::non_empty_text)
}

/// `(likes, comments, shares)` from the post's engagement block.
pub fn extract_engagement(document: &Html) -> (Option<u64>, Option<u64>, Option<u64>) {
    let Some(toolbar) = find_toolbar(document) else {
        return (None, None, None);
    };
    let Some(container) = engagement_container(toolbar) else {
        return (None, None, None);
    };

    let likes = likes_block_count(document).or_else(|| max_toolbar_count(toolbar));

    let buttons: Vec<ElementRef<'_>> = dom::all(container, "div[role='button']")
        .into_iter()
        .filter(|b| dom::first(*b, ICON).is_some() && !dom::is_hidden(*b))
        .take(2)
        .collect();

    let comments = buttons.first().and_then(|b| count_beside_icon(*b, Side::Before));
    let shares = buttons.get(1).and_then(|b| count_beside_icon(*b, Side::After));

    (likes, comments, shares)
}

/// `(username, profile_url)` of the poster.
pub fn extract_author(document: &Html, page_url: &str) -> (Option<String>, Option<String>) {
    let Some(block) = dom::doc_first(document, AUTHOR) else {
        return (None, None);
    };

    let username = dom::non_empty_text(block);
    let profile_url = dom::first(block, "a")
        .and_then(|a| dom::attr(a, "href"))
        .map(|href| resolve(page_url, &href));

    (username, profile_url)
}

/// Source of the post's main image.
pub fn extract_image_src(document: &Html) -> Option<String> {
    dom::doc_first(document, POST_IMAGE).and_then(|img| dom::attr(img, "src"))
}

/// Where the second dialog's photo lives: the link wrapping it, else the image itself.
pub fn photo_dialog_target(document: &Html, page_url: &str) -> Option<String> {
    let dialogs = dom::doc_all(document, "div[role='dialog']");
    let dialog = *dialogs.get(1)?;

    let link = dom::all(dialog, "a[href]")
        .into_iter()
        .find(|a| dom::first(*a, "img[src]").is_some())
        .and_then(|a| dom::attr(a, "href"));

    link.or_else(|| dom::first(dialog, "img[src]").and_then(|img| dom::attr(img, "src")))
        .map(|target| resolve(page_url, &target))
}

fn find_toolbar(document: &Html) -> Option<ElementRef<'_>> {
    dom::doc_all(document, TOOLBAR_CANDIDATES)
        .into_iter()
        .find(|el| {
            el.value().attr("aria-label").is_some_and(|l| l.contains(REACTED_LABEL))
                || dom::attr_contains_ci(*el, "aria-label", "reacted")
        })
}

fn engagement_container(toolbar: ElementRef<'_>) -> Option<ElementRef<'_>> {
    dom::ancestors(toolbar)
        .find(|a| {
            a.value().name() == "div" && dom::has_classes(*a, &[ENGAGEMENT_CONTAINER_CLASS])
        })
        .or_else(|| dom::parent_div(toolbar))
}

fn likes_block_count(document: &Html) -> Option<u64> {
    let span = dom::doc_first(document, LIKES_SPAN)?;
    let block = dom::parent_div(span)?;
    parse_count(&dom::text_of(block))
}

fn max_toolbar_count(toolbar: ElementRef<'_>) -> Option<u64> {
    std::iter::once(toolbar)
        .chain(dom::all(toolbar, "span, div"))
        .filter_map(|el| parse_count(&dom::text_of(el)))
        .max()
}

/// Counter on the wanted side of the button's icon, else the other side,
/// else the first counter anywhere in the button.
fn count_beside_icon(button: ElementRef<'_>, side: Side) -> Option<u64> {
    let whole_button = || parse_count(&dom::text_of(button));
    let Some(icon) = dom::first(button, ICON) else {
        return whole_button();
    };

    let mut before = None;
    let mut after = None;
    let mut past_icon = false;

    for node in button.descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if el.id() == icon.id() {
            past_icon = true;
            continue;
        }
        if el.value().name() != "span" || dom::contains(el, icon) {
            continue;
        }
        let Some(value) = parse_count(&dom::text_of(el)) else {
            continue;
        };
        let slot = if past_icon { &mut after } else { &mut before };
        slot.get_or_insert(value);
    }

    let (wanted, other) = match side {
        Side::Before => (before, after),
        Side::After => (after, before),
    };
    wanted.or(other).or_else(whole_button)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PacingConfig;
    use crate::services::browser::fake::FakeBrowser;
    use crate::services::overlays::{REMOVE_CROSS, SEE_MORE, SEE_POST_ANYWAY, SEE_WHY};

    const POST_URL: &str = "https://www.facebook.com/Ductour123/posts/pfbid02TF";

    const POST_PAGE: &str = r#"
        <html><body>
        <div class="x1n2onr6 outer">
          <div class="xu06os2 x1ok221b other">
            <span><a href="/profile.php?id=100063609225380">Ductour News</a></span>
          </div>
          <div class="xyinxu5 xyri2b x1g2khh7 x1c1uobl">
            عاجل: خبر   مهم
            <div>See less</div>
          </div>
          <img data-visualcompletion="media-vc-image" src="https://scontent.xx.fbcdn.net/p.jpg">
          <div class="x1n2onr6">
            <div>
              <span aria-label="See who reacted to this"></span>
              <span>1.2K</span>
            </div>
            <div role="toolbar" aria-label="See who reacted to this">
              <span><span>Like</span></span>
            </div>
            <div role="button"><span>348</span><i data-visualcompletion="css-img"></i></div>
            <div role="button" style="display:none"><i data-visualcompletion="css-img"></i><span>9</span></div>
            <div role="button"><i data-visualcompletion="css-img"></i><span>٥٦</span></div>
          </div>
        </div>
        </body></html>
    "#;

    fn row() -> UrlRow {
        UrlRow::new(POST_URL, "313")
    }

    fn config() -> Config {
        Config {
            pacing: PacingConfig::immediate(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn flow_bypasses_overlay_twice_then_expands_caption() {
        let browser = FakeBrowser::new()
            .with_page(POST_URL, POST_PAGE)
            .with_clickable(SEE_WHY)
            .with_clickable(SEE_POST_ANYWAY)
            .with_clickable(SEE_MORE)
            .with_present(CAPTION_XPATH);

        let record = scrape(&browser, &row(), &config()).await;

        assert_eq!(browser.visited(), vec![POST_URL]);
        assert_eq!(
            browser.clicked(),
            vec![SEE_WHY, SEE_POST_ANYWAY, SEE_WHY, SEE_POST_ANYWAY, SEE_MORE]
        );
        assert_eq!(browser.waited(), vec![CAPTION_XPATH]);
        assert_eq!(record.text.as_deref(), Some("عاجل: خبر مهم See less"));
        assert_eq!(record.like, Some(1200));
        assert_eq!(record.url, POST_URL);
    }

    #[tokio::test]
    async fn flow_skips_see_more_without_caption() {
        let browser = FakeBrowser::new()
            .with_page(POST_URL, POST_PAGE)
            .with_clickable(SEE_MORE);

        scrape(&browser, &row(), &config()).await;

        assert_eq!(browser.waited(), vec![CAPTION_XPATH]);
        assert!(browser.clicked().is_empty());
    }

    #[tokio::test]
    async fn flow_follows_photo_dialog() {
        let share = "https://www.facebook.com/share/p/19Y9wiX1VW/";
        let photo = "https://www.facebook.com/photo/?fbid=936674068672820";
        let dialog_page = r#"
            <div role="dialog">first</div>
            <div role="dialog">
              <a href="/photo/?fbid=936674068672820"><img src="https://cdn/x.jpg"></a>
            </div>
        "#;
        let browser = FakeBrowser::new()
            .with_page(share, dialog_page)
            .with_page(photo, POST_PAGE)
            .with_clickable(REMOVE_CROSS);

        let record = scrape(&browser, &UrlRow::new(share, "9"), &config()).await;

        assert_eq!(browser.visited(), vec![share, photo]);
        assert_eq!(browser.clicked(), vec![REMOVE_CROSS, REMOVE_CROSS]);
        assert_eq!(record.url, share);
        assert_eq!(
            record.image_src.as_deref(),
            Some("https://scontent.xx.fbcdn.net/p.jpg")
        );
    }

    #[tokio::test]
    async fn unreadable_source_gives_an_empty_record() {
        let browser = FakeBrowser::new()
            .with_page(POST_URL, POST_PAGE)
            .with_broken_source();

        let record = scrape(&browser, &row(), &config()).await;

        assert_eq!(
            record,
            PostRecord {
                news_id: "313".to_string(),
                url: POST_URL.to_string(),
                ..PostRecord::default()
            }
        );
    }

    #[test]
    fn extracts_full_post() {
        let doc = Html::parse_document(POST_PAGE);
        let record = extract_post(&doc, POST_URL, &row());

        assert_eq!(record.news_id, "313");
        assert_eq!(record.text.as_deref(), Some("عاجل: خبر مهم See less"));
        assert_eq!(record.username.as_deref(), Some("Ductour News"));
        assert_eq!(
            record.profile_url.as_deref(),
            Some("https://www.facebook.com/profile.php?id=100063609225380")
        );
        assert_eq!(
            record.image_src.as_deref(),
            Some("https://scontent.xx.fbcdn.net/p.jpg")
        );
    }

    #[test]
    fn counts_come_from_the_engagement_container() {
        let doc = Html::parse_document(POST_PAGE);
        assert_eq!(extract_engagement(&doc), (Some(1200), Some(348), Some(56)));
    }

    #[test]
    fn buttons_outside_the_container_are_ignored() {
        let html = r#"
            <div class="x1n2onr6">
              <div role="toolbar" aria-label="See who reacted to this"><span>3</span></div>
            </div>
            <div role="button"><span>12</span><i data-visualcompletion="css-img"></i></div>
        "#;
        let doc = Html::parse_document(html);
        assert_eq!(extract_engagement(&doc), (Some(3), None, None));
    }

    #[test]
    fn comments_left_of_icon_shares_right_of_icon() {
        let html = r#"
            <div class="x1n2onr6">
              <div role="group" aria-label="See who reacted to this post">
                <span>45</span>
              </div>
              <div role="button"><span>12</span><i data-visualcompletion="css-img"></i><span>Comment</span></div>
              <div role="button" hidden><i data-visualcompletion="css-img"></i><span>99</span></div>
              <div role="button"><span>Share</span><i data-visualcompletion="css-img"></i><span>3.4K</span></div>
            </div>
        "#;
        let doc = Html::parse_document(html);
        assert_eq!(extract_engagement(&doc), (Some(45), Some(12), Some(3400)));
    }

    #[test]
    fn counter_falls_back_to_other_side() {
        let html = r#"
            <div class="x1n2onr6">
              <div role="toolbar" aria-label="Reacted by 7 people"><span>7</span></div>
              <div role="button"><i data-visualcompletion="css-img"></i><span>٢٣</span></div>
            </div>
        "#;
        let doc = Html::parse_document(html);
        assert_eq!(extract_engagement(&doc), (Some(7), Some(23), None));
    }

    #[test]
    fn wrapping_span_is_not_counted_on_either_side() {
        let html = r#"
            <div class="x1n2onr6">
              <div role="toolbar" aria-label="See who reacted to this"></div>
              <div role="button">
                <span><i data-visualcompletion="css-img"></i> 8</span>
                <span>5</span>
              </div>
            </div>
        "#;
        let doc = Html::parse_document(html);
        let (_, comments, _) = extract_engagement(&doc);
        assert_eq!(comments, Some(5));
    }

    #[test]
    fn missing_toolbar_means_no_counts() {
        let doc = Html::parse_document("<div role='button'><span>4</span></div>");
        assert_eq!(extract_engagement(&doc), (None, None, None));
    }

    #[test]
    fn missing_author_block_is_null() {
        let doc = Html::parse_document("<div class='xu06os2'>Not it</div>");
        assert_eq!(extract_author(&doc, "https://www.facebook.com/"), (None, None));
    }

    #[test]
    fn photo_dialog_prefers_wrapping_link() {
        let html = r#"
            <div role="dialog">first</div>
            <div role="dialog">
              <a href="/photo/?fbid=936674068672820"><img src="https://cdn/x.jpg"></a>
            </div>
        "#;
        let doc = Html::parse_document(html);
        assert_eq!(
            photo_dialog_target(&doc, "https://www.facebook.com/share/p/19Y9wiX1VW/").as_deref(),
            Some("https://www.facebook.com/photo/?fbid=936674068672820")
        );
    }

    #[test]
    fn photo_dialog_falls_back_to_image() {
        let html = r#"
            <div role="dialog"></div>
            <div role="dialog"><img src="https://cdn/y.jpg"></div>
        "#;
        let doc = Html::parse_document(html);
        assert_eq!(
            photo_dialog_target(&doc, "https://www.facebook.com/").as_deref(),
            Some("https://cdn/y.jpg")
        );
    }

    #[test]
    fn single_dialog_has_no_target() {
        let doc = Html::parse_document("<div role='dialog'><img src='x.jpg'></div>");
        assert_eq!(photo_dialog_target(&doc, "https://www.facebook.com/"), None);
    }

    #[test]
    fn selectors_parse() {
        for css in [
            CAPTION,
            TOOLBAR_CANDIDATES,
            LIKES_SPAN,
            ICON,
            AUTHOR,
            POST_IMAGE,
        ] {
            assert!(dom::parse_selector(css).is_ok(), "{css}");
        }
    }
}

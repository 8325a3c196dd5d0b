// src/utils/dom.rs

//! Small helpers over `scraper` for walking rendered page source.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};

/// Parse a CSS selector, reporting the offending string on failure.
pub fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::selector(css, format!("{e:?}")))
}

fn selector(css: &str) -> Option<Selector> {
    match parse_selector(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            log::debug!("{e}");
            None
        }
    }
}

/// First match of `css` in the whole document.
pub fn doc_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    document.select(&sel).next()
}

/// Every match of `css` in the whole document, in document order.
pub fn doc_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => document.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// First match of `css` below `scope`.
pub fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    scope.select(&sel).next()
}

/// Every match of `css` below `scope`, in document order.
pub fn all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => scope.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// Whitespace-normalized text content of an element.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content, or `None` when it is blank.
pub fn non_empty_text(el: ElementRef<'_>) -> Option<String> {
    let text = text_of(el);
    (!text.is_empty()).then_some(text)
}

/// Attribute value, or `None` when missing or blank.
pub fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Whether the element carries every class in `classes`, in any order.
pub fn has_classes(el: ElementRef<'_>, classes: &[&str]) -> bool {
    classes
        .iter()
        .all(|wanted| el.value().classes().any(|c| c == *wanted))
}

/// Case-insensitive substring test on an attribute.
pub fn attr_contains_ci(el: ElementRef<'_>, name: &str, needle: &str) -> bool {
    el.value()
        .attr(name)
        .is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase()))
}

/// Element ancestors, nearest first.
pub fn ancestors<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.ancestors().filter_map(ElementRef::wrap)
}

/// Nearest ancestor `div`.
pub fn parent_div<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    ancestors(el).find(|a| a.value().name() == "div")
}

/// Whether `descendant` sits somewhere below `el`.
pub fn contains(el: ElementRef<'_>, descendant: ElementRef<'_>) -> bool {
    ancestors(descendant).any(|a| a.id() == el.id())
}

/// Whether the element or an ancestor is marked hidden in the markup.
pub fn is_hidden(el: ElementRef<'_>) -> bool {
    std::iter::once(el).chain(ancestors(el)).any(|e| {
        let v = e.value();
        v.attr("hidden").is_some()
            || v.attr("aria-hidden") == Some("true")
            || v.attr("style").is_some_and(|s| {
                let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                s.contains("display:none") || s.contains("visibility:hidden")
            })
    })
}

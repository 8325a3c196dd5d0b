// src/utils/numbers.rs

//! Numeric normalization for engagement counters.
//!
//! Counters arrive as whatever the UI renders: plain digits, thousands
//! separators, `K`/`M`/`B` abbreviations, Arabic-Indic digits, Arabic
//! magnitude words, wrapped in bidi control marks.

use std::sync::LazyLock;

use regex::Regex;

static DIGIT_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[0-9]+").ok());

static WHOLE_COUNT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?)\s*([KkMmBb]|ألف|آلاف|مليون|مليار)?$").ok()
});

static EMBEDDED_COUNT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*([KkMmBb]\b|ألف|آلاف|مليون|مليار)?").ok()
});

/// Map Arabic-Indic digits and separators to ASCII and drop bidi marks.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from_digit(c as u32 - 0x0660, 10),
            '\u{06F0}'..='\u{06F9}' => char::from_digit(c as u32 - 0x06F0, 10),
            '\u{066B}' => Some('.'),
            '\u{066C}' => Some(','),
            '\u{200E}' | '\u{200F}' | '\u{061C}' | '\u{202A}'..='\u{202E}'
            | '\u{2066}'..='\u{2069}' => None,
            _ => Some(c),
        })
        .collect()
}

/// Every run of digits in `text`, in order.
pub fn all_ints(text: &str) -> Vec<u64> {
    let Some(re) = DIGIT_RUN.as_ref() else {
        return Vec::new();
    };
    let norm = normalize_digits(text);
    re.find_iter(&norm)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// First run of digits in `text`.
pub fn first_int(text: &str) -> Option<u64> {
    all_ints(text).into_iter().next()
}

/// Parse a rendered counter such as `"1.2K"`, `"3,456"` or `"2 مليون"`.
///
/// When the whole string is not a counter, the first counter-looking token
/// inside it is used, so `"1.2K comments"` still yields 1200.
pub fn parse_count(text: &str) -> Option<u64> {
    let norm = normalize_digits(text);
    let norm = norm.trim().replace(',', "");
    if norm.is_empty() {
        return None;
    }

    let caps = WHOLE_COUNT
        .as_ref()?
        .captures(&norm)
        .or_else(|| EMBEDDED_COUNT.as_ref()?.captures(&norm))?;

    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let scale = caps.get(2).map_or(1.0, |m| multiplier(m.as_str()));
    let scaled = (value * scale).round();

    if scaled.is_finite() && scaled >= 0.0 && scaled <= u64::MAX as f64 {
        Some(scaled as u64)
    } else {
        None
    }
}

fn multiplier(suffix: &str) -> f64 {
    match suffix {
        "K" | "k" | "ألف" | "آلاف" => 1_000.0,
        "M" | "m" | "مليون" => 1_000_000.0,
        "B" | "b" | "مليار" => 1_000_000_000.0,
        _ => 1.0,
    }
}

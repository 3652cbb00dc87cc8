//! Text helpers shared by the scrapers and the message formatter.
//!
//! - Whitespace cleanup of scraped element text
//! - Link normalization against a source's base URL
//! - HTML and URL escaping for Telegram messages
//! - String truncation for logging

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collect the text of an element, collapse whitespace runs and trim.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Collapse every run of whitespace into one space and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Resolve a scraped `href` against a source's base URL.
///
/// - `/path` is appended to the base
/// - absolute URLs are kept as they are
/// - anything else is treated as relative and joined with a `/`
///
/// Empty links yield `None`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_url("https://a.org", "/x").as_deref(), Some("https://a.org/x"));
/// assert_eq!(normalize_url("https://a.org", "x.pdf").as_deref(), Some("https://a.org/x.pdf"));
/// ```
pub fn normalize_url(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        Some(format!("{base}{href}"))
    } else if Url::parse(href).is_ok() {
        Some(href.to_string())
    } else {
        Some(format!("{base}/{href}"))
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-escape a URL for use inside an `href` attribute.
///
/// Unreserved characters, `:/?=&` and existing `%XX` escapes are kept;
/// every other byte is encoded.
pub fn escape_url(url: &str) -> String {
    const SAFE: &[u8] = b"-_.~:/?=&";
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    for (i, &b) in bytes.iter().enumerate() {
        let is_escape = b == b'%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        if b.is_ascii_alphanumeric() || SAFE.contains(&b) || is_escape {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (backing off to a char boundary) with
/// `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

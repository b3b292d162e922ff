//! Selectors and text helpers for the HTML-based exports.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

pub(crate) static H2: Lazy<Selector> = Lazy::new(|| selector("h2"));
pub(crate) static TABLE: Lazy<Selector> = Lazy::new(|| selector("table"));
pub(crate) static TR: Lazy<Selector> = Lazy::new(|| selector("tr"));
pub(crate) static TH: Lazy<Selector> = Lazy::new(|| selector("th"));
pub(crate) static TD: Lazy<Selector> = Lazy::new(|| selector("td"));
pub(crate) static PRE: Lazy<Selector> = Lazy::new(|| selector("pre"));
pub(crate) static BOLD: Lazy<Selector> = Lazy::new(|| selector("b"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// All text nodes of an element joined by single spaces
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Remove markup from one line of serialized HTML and decode common entities
pub(crate) fn strip_tags(line: &str) -> String {
    TAG.replace_all(line, "")
        .replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

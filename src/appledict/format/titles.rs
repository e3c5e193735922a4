//! Headword extraction from inflated entry markup.
//!
//! Entries carry their headwords as `d:title="…"` attributes: the root
//! `<d:entry>` holds the primary title and nested elements may declare
//! secondary titles for phrases and related forms. Only the attribute values
//! are located; the markup is not otherwise parsed.

use std::sync::OnceLock;

use log::trace;
use quick_xml::escape::unescape;
use regex::bytes::Regex;

use crate::appledict::utils::normalize_headword;

static TITLE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn title_regex() -> &'static Regex {
    TITLE_PATTERN.get_or_init(|| Regex::new(r#"d:title="([^"]+)""#).expect("Invalid title regex pattern"))
}

/// Returns every distinct headword declared in `markup`, normalized, in
/// document order. The first element is the primary title.
pub fn extract_headwords(markup: &[u8]) -> Vec<String> {
    let mut headwords: Vec<String> = Vec::new();
    for cap in title_regex().captures_iter(markup) {
        let raw = String::from_utf8_lossy(&cap[1]);
        let title = match unescape(&raw) {
            Ok(unescaped) => normalize_headword(&unescaped),
            Err(e) => {
                trace!("Keeping title {:?} verbatim: {}", raw, e);
                normalize_headword(&raw)
            }
        };
        if !headwords.contains(&title) {
            headwords.push(title);
        }
    }
    headwords
}

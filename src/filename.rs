//! Download filenames of the form
//! `Reactlyve-<content>-<responder>-<ddMMyyyy-HHmm>.<ext>`.
//!
//! Lengths and replacements count UTF-16 code units, so a character outside
//! the BMP takes two slug positions and becomes `__`. Names match the ones
//! the web client produces for the same reaction.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

use crate::reaction::parse_timestamp;

pub const BRAND_PREFIX: &str = "Reactlyve";
pub const DEFAULT_CONTENT: &str = "video";
pub const DEFAULT_RESPONDER: &str = "UnknownResponder";
pub const DEFAULT_TIMESTAMP: &str = "timestamp";
pub const DEFAULT_EXTENSION: &str = "mp4";

const CONTENT_SLUG_UNITS: usize = 5;
const TIMESTAMP_FORMAT: &str = "%d%m%Y-%H%M";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("valid filename pattern"));

pub fn synthesize(
    parent_content: Option<&str>,
    responder_name: Option<&str>,
    created_at: Option<&str>,
    media_url: &str,
) -> String {
    let content = non_empty(parent_content)
        .map(|content| truncate_utf16(&collapse_whitespace(content), CONTENT_SLUG_UNITS))
        .unwrap_or_else(|| DEFAULT_CONTENT.to_string());
    let responder = non_empty(responder_name)
        .map(collapse_whitespace)
        .unwrap_or_else(|| DEFAULT_RESPONDER.to_string());
    let timestamp = timestamp_slug(created_at).unwrap_or_else(|| DEFAULT_TIMESTAMP.to_string());

    let stem = [
        BRAND_PREFIX,
        content.as_str(),
        responder.as_str(),
        timestamp.as_str(),
    ]
    .join("-");
    let stem = UNSAFE_CHARS.replace_all(&stem, |caps: &Captures<'_>| {
        "_".repeat(caps[0].encode_utf16().count())
    });
    format!("{stem}.{}", extension(media_url))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

fn collapse_whitespace(value: &str) -> String {
    WHITESPACE.replace_all(value, "_").into_owned()
}

// A surrogate pair cut in half leaves a lone unit, which sanitizes to `_`.
fn truncate_utf16(value: &str, max_units: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in value.chars() {
        let units = c.len_utf16();
        if used + units > max_units {
            if used < max_units {
                out.push('_');
            }
            break;
        }
        out.push(c);
        used += units;
    }
    out
}

fn timestamp_slug(created_at: Option<&str>) -> Option<String> {
    parse_timestamp(created_at?).map(|at| at.format(TIMESTAMP_FORMAT).to_string())
}

pub fn extension(media_url: &str) -> String {
    let Ok(url) = Url::parse(media_url) else {
        return DEFAULT_EXTENSION.to_string();
    };
    url.path()
        .rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string()
}

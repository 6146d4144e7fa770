//! Main-text extraction from an HTML page

use regex_lite::{Captures, Regex};
use std::sync::LazyLock;

/// Blocks that never hold article text
const NOISE_TAGS: [&str; 8] = [
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript",
];

static NOISE_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NOISE_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("Invalid noise block regex")
        })
        .collect()
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex"));

/// Candidate containers, most specific first
static CONTAINERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["article", "main", "body"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*)</{tag}\s*>"))
                .expect("Invalid container regex")
        })
        .collect()
});

static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:p|div|br|li|ul|ol|h[1-6]|tr|td|th|dt|dd|table|section|blockquote|pre)\b[^>]*>")
        .expect("Invalid block tag regex")
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("Invalid entity regex")
});

static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\x0C\x{A0}]+").expect("Invalid whitespace regex"));

/// Extract readable text from `html`. Returns an empty string when the page
/// has no text outside boilerplate.
pub fn extract_main_text(html: &str) -> String {
    let mut cleaned = COMMENT.replace_all(html, " ").into_owned();
    for block in NOISE_BLOCKS.iter() {
        cleaned = block.replace_all(&cleaned, " ").into_owned();
    }

    let region = CONTAINERS
        .iter()
        .find_map(|container| {
            container
                .captures(&cleaned)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .filter(|inner| !strip_tags(inner).trim().is_empty())
        })
        .unwrap_or(cleaned.as_str());

    normalize_whitespace(&decode_entities(&strip_tags(region)))
}

fn strip_tags(html: &str) -> String {
    let with_breaks = BLOCK_TAG.replace_all(html, "\n");
    ANY_TAG.replace_all(&with_breaks, "").into_owned()
}

pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                "ndash" => Some('\u{2013}'),
                "mdash" => Some('\u{2014}'),
                "hellip" => Some('\u{2026}'),
                "rsquo" => Some('\u{2019}'),
                "lsquo" => Some('\u{2018}'),
                "rdquo" => Some('\u{201d}'),
                "ldquo" => Some('\u{201c}'),
                _ => numeric_entity(name),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

/// Collapse runs of spaces and keep at most one blank line between blocks
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

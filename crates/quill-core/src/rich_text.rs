//! Conversion between comment html and plain text.

use std::collections::HashMap;
use std::sync::LazyLock;

use quill_types::AccountId;
use regex::{Captures, Regex};

static BREAK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("Invalid line break regex"));

static USER_MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<mention-user\s+accountID="?(\d+)"?\s*(?:/>|>(.*?)</mention-user>)"#)
        .expect("Invalid user mention regex")
});

static REPORT_MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<mention-report\s+reportID="?(\d+)"?\s*(?:/>|>(.*?)</mention-report>)"#)
        .expect("Invalid report mention regex")
});

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));

static BOLD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("Invalid bold regex"));

/// Names used to resolve mention tags that carry only an id.
#[derive(Debug, Clone, Default)]
pub struct MentionNames {
    pub accounts: HashMap<AccountId, String>,
    pub reports: HashMap<String, String>,
}

pub trait RichText: Send + Sync {
    fn html_to_text(&self, html: &str, names: &MentionNames) -> String;

    fn text_to_html(&self, text: &str) -> String;
}

/// Minimal converter: tags, mentions, line breaks, entities and `*bold*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRichText;

impl RichText for BasicRichText {
    fn html_to_text(&self, html: &str, names: &MentionNames) -> String {
        let text = BREAK_REGEX.replace_all(html, "\n");
        let text = USER_MENTION_REGEX.replace_all(&text, |caps: &Captures| {
            if let Some(inner) = caps.get(2).filter(|m| !m.as_str().is_empty()) {
                return inner.as_str().to_string();
            }
            let name = caps[1]
                .parse::<AccountId>()
                .ok()
                .and_then(|id| names.accounts.get(&id))
                .cloned()
                .unwrap_or_default();
            format!("@{}", name)
        });
        let text = REPORT_MENTION_REGEX.replace_all(&text, |caps: &Captures| {
            if let Some(inner) = caps.get(2).filter(|m| !m.as_str().is_empty()) {
                return inner.as_str().to_string();
            }
            names.reports.get(&caps[1]).cloned().unwrap_or_default()
        });
        let text = TAG_REGEX.replace_all(&text, "");
        unescape_html(&text)
    }

    fn text_to_html(&self, text: &str) -> String {
        let escaped = escape_html(text);
        let bold = BOLD_REGEX.replace_all(&escaped, "<strong>$1</strong>");
        bold.replace('\n', "<br />")
    }
}

/// Report ids referenced by `<mention-report>` tags, in order of appearance.
pub fn mentioned_report_ids(html: &str) -> Vec<String> {
    REPORT_MENTION_REGEX
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_html(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

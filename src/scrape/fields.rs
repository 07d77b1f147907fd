//! Field-level extraction strategies.
//!
//! Disclosure pages put scalar facts next to their labels, either in
//! definition tables or stacked divs. Flattening the DOM to one text node
//! per line and searching a bounded window after each label copes with both
//! layouts; structured sections (holdings, peers, FAQs) walk the DOM itself.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const LABEL_WINDOW: usize = 80;
const TEXT_WINDOW: usize = 200;
const MAX_HOLDINGS: usize = 10;
const MAX_PEERS: usize = 8;
const MAX_ANSWER_CHARS: usize = 1200;

/// Riskometer levels, longest label first so "Moderately High" never
/// truncates to "High".
const RISK_LEVELS: [&str; 6] = [
    "Low to Moderate",
    "Moderately High",
    "Very High",
    "Moderate",
    "High",
    "Low",
];

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*%").unwrap());
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:₹|rs\.?\s*|inr\s*)([\d,]+(?:\.\d+)?)").unwrap());
static CRORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s*(?:cr(?:ore)?s?)\b").unwrap());

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());
static QUESTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, dt, summary").unwrap());

/// Visible page text, one flattened line per DOM text node. Script, style
/// and noscript contents are skipped.
pub(crate) struct PageText(String);

impl PageText {
    pub(crate) fn new(document: &Html) -> Self {
        let mut lines: Vec<String> = Vec::new();
        for node in document.root_element().descendants() {
            if let Some(text) = node.value().as_text() {
                let visible = node
                    .parent()
                    .and_then(ElementRef::wrap)
                    .map(|el| !matches!(el.value().name(), "script" | "style" | "noscript"))
                    .unwrap_or(true);
                if !visible {
                    continue;
                }
                let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !trimmed.is_empty() {
                    lines.push(trimmed);
                }
            }
        }
        Self(lines.join("\n"))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Fund name: first `<h1>`, else `<title>` up to the site separator, else
/// the URL slug title-cased.
pub(crate) fn extract_fund_name(document: &Html, url: &str) -> Option<String> {
    for h1 in document.select(&H1_SEL) {
        let text = element_text(h1);
        if !text.is_empty() {
            return Some(text);
        }
    }

    if let Some(title) = document.select(&TITLE_SEL).next() {
        let text = element_text(title);
        if let Some(head) = text.split('|').next() {
            let head = head.trim();
            if !head.is_empty() {
                return Some(head.to_string());
            }
        }
    }

    let parsed = Url::parse(url).ok()?;
    let slug = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?;
    let name = slug
        .split('-')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// First percentage in the window after any of the labels, e.g. "0.52%".
pub(crate) fn percent_after(text: &PageText, labels: &[&str]) -> Option<String> {
    let window = window_after(text.as_str(), labels, LABEL_WINDOW)?;
    let captures = PERCENT_RE.captures(window)?;
    Some(format!("{}%", &captures[1]))
}

/// First rupee amount in the window after any of the labels, normalized to
/// a "₹" prefix.
pub(crate) fn currency_after(text: &PageText, labels: &[&str]) -> Option<String> {
    let window = window_after(text.as_str(), labels, LABEL_WINDOW)?;
    let captures = CURRENCY_RE.captures(window)?;
    Some(format!("₹{}", &captures[1]))
}

/// First text line after any of the labels, with leading separators and
/// trailing punctuation stripped.
pub(crate) fn text_after(text: &PageText, labels: &[&str]) -> Option<String> {
    let window = window_after(text.as_str(), labels, TEXT_WINDOW)?;
    let value = window
        .trim_start_matches([':', '-', '–', ' ', '\n'])
        .lines()
        .next()?
        .trim()
        .trim_end_matches([',', '.', ':'])
        .trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// A trailing-period return. Values outside -100%..1000% are treated as
/// extraction noise and dropped rather than clamped.
pub(crate) fn return_after(text: &PageText, labels: &[&str]) -> Option<String> {
    let window = window_after(text.as_str(), labels, LABEL_WINDOW)?;
    let captures = PERCENT_RE.captures(window)?;
    let value: f64 = captures[1].parse().ok()?;
    if !(-100.0..=1000.0).contains(&value) {
        return None;
    }
    Some(format!("{}%", &captures[1]))
}

/// Riskometer level from the fixed SEBI vocabulary, searched near a risk
/// label and returned in canonical casing.
pub(crate) fn riskometer(text: &PageText) -> Option<String> {
    let window = window_after(text.as_str(), &["riskometer", "risk level", "risk"], 160)?;
    for level in RISK_LEVELS {
        if find_label(window, level).is_some() {
            return Some(level.to_string());
        }
    }
    None
}

/// AUM with its crore unit when present, else any rupee amount near the
/// label.
pub(crate) fn aum_after(text: &PageText, labels: &[&str]) -> Option<String> {
    let window = window_after(text.as_str(), labels, LABEL_WINDOW)?;
    if let Some(captures) = CRORE_RE.captures(window) {
        return Some(format!("₹{} Cr", &captures[1]));
    }
    let captures = CURRENCY_RE.captures(window)?;
    Some(format!("₹{}", &captures[1]))
}

/// Rows of the first table whose header mentions holdings, as
/// `(name, allocation %)`. Capped because pages list the full portfolio.
pub(crate) fn holdings(document: &Html) -> Vec<(String, Option<f64>)> {
    table_rows(document, &["holding", "allocation", "assets (%)"], MAX_HOLDINGS)
}

/// Peer comparison rows as `(name, 1Y return %)`. Implausible returns are
/// dropped the same way scalar returns are.
pub(crate) fn peers(document: &Html) -> Vec<(String, Option<f64>)> {
    table_rows(document, &["peer", "comparison", "similar fund"], MAX_PEERS)
        .into_iter()
        .map(|(name, value)| (name, value.filter(|pct| (-100.0..=1000.0).contains(pct))))
        .collect()
}

fn table_rows(
    document: &Html,
    header_markers: &[&str],
    cap: usize,
) -> Vec<(String, Option<f64>)> {
    for table in document.select(&TABLE_SEL) {
        let mut rows = table.select(&ROW_SEL);
        let Some(header) = rows.next() else { continue };
        let header_text = element_text(header).to_lowercase();
        if !header_markers.iter().any(|m| header_text.contains(m)) {
            continue;
        }

        let mut out = Vec::new();
        for row in rows {
            let cells: Vec<String> = row.select(&CELL_SEL).map(element_text).collect();
            let Some(name) = cells.first().filter(|c| !c.is_empty()) else {
                continue;
            };
            let value = cells
                .iter()
                .skip(1)
                .find_map(|cell| PERCENT_RE.captures(cell))
                .and_then(|captures| captures[1].parse::<f64>().ok());
            out.push((name.clone(), value));
            if out.len() >= cap {
                break;
            }
        }
        if !out.is_empty() {
            return out;
        }
    }
    Vec::new()
}

/// Question/answer pairs: any heading-like element ending in "?" paired
/// with the text of its following siblings up to the next question.
pub(crate) fn faqs(document: &Html) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for element in document.select(&QUESTION_SEL) {
        let question = element_text(element);
        if !question.ends_with('?') {
            continue;
        }

        let answer = answer_after(element);
        if answer.is_empty() {
            continue;
        }
        if out.iter().any(|(q, _)| q == &question) {
            continue;
        }
        out.push((question, answer));
    }
    out
}

fn answer_after(question: ElementRef<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    for sibling in question.next_siblings() {
        if let Some(element) = ElementRef::wrap(sibling) {
            if matches!(element.value().name(), "h1" | "h2" | "h3" | "h4" | "dt" | "summary") {
                break;
            }
            let text = element_text(element);
            if !text.is_empty() {
                parts.push(text);
            }
        } else if let Some(text) = sibling.value().as_text() {
            let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
        if parts.len() >= 3 {
            break;
        }
    }

    let mut answer = parts.join(" ");
    if answer.len() > MAX_ANSWER_CHARS {
        let mut end = MAX_ANSWER_CHARS;
        while !answer.is_char_boundary(end) {
            end -= 1;
        }
        answer.truncate(end);
    }
    answer.trim().to_string()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Window of original-case text after the first label that occurs in the
/// page. Labels are matched ASCII case-insensitively.
fn window_after<'a>(text: &'a str, labels: &[&str], window: usize) -> Option<&'a str> {
    for label in labels {
        if let Some(pos) = find_label(text, label) {
            let start = pos + label.len();
            let mut end = text.len().min(start + window);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            return Some(&text[start..end]);
        }
    }
    None
}

/// Case-insensitive label search that rejects matches embedded in a longer
/// word, so "nav" does not hit "Navigation".
fn find_label(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(rel) = find_ci(&haystack[from..], needle) {
        let pos = from + rel;
        let end = pos + needle.len();
        let before_ok = pos == 0 || !bytes[pos - 1].is_ascii_alphanumeric();
        let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    'outer: for i in 0..=haystack.len() - needle.len() {
        for j in 0..needle.len() {
            if !haystack[i + j].eq_ignore_ascii_case(&needle[j]) {
                continue 'outer;
            }
        }
        return Some(i);
    }
    None
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

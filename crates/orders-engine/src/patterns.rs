//! Grammar patterns for the orders report.
//!
//! The report rows are parsed with a two-rule grammar over each text block:
//! a trailing-anchored primary rule for fully structured rows, and a fallback
//! rule that only looks for an article-shaped token. The rules are exposed as
//! an ordered list so the fallback behavior is testable in isolation.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Shipment number: digit group, hyphen, 4 digits, hyphen, 1-2 digits.
    pub static ref SHIPMENT_NUMBER: Regex =
        Regex::new(r"\d{8,12}-\d{4}-\d{1,2}").unwrap();

    /// Fully structured row, anchored to the end of the block:
    /// product name, article, quantity, 4-digit label number, and an
    /// optional carry-over row index. Quantity and label number are
    /// structural anchors only and are discarded.
    static ref PRIMARY_ROW: Regex = Regex::new(
        r"(?s)^\s*(?P<name>.+?)\s+(?P<article>\S+)\s+\d+\s+\d{4}(?:\s+\d+)?\s*$"
    )
    .unwrap();

    /// Article-shaped token: alphanumeric runs joined by `-` or `/`,
    /// e.g. "F/034".
    static ref ARTICLE_TOKEN: Regex = Regex::new(r"\w+[-/]\w+").unwrap();

    /// Stray row indices leaking into a product name.
    static ref LEADING_NOISE: Regex = Regex::new(r"^[\d\s]+").unwrap();
}

/// Product name and article recovered from one row block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub product_name: String,
    pub article: String,
}

/// A single grammar rule over a row block.
pub type RowRule = fn(&str) -> Option<ParsedRow>;

/// The row grammar, in application order. The first rule that matches wins.
pub const ROW_RULES: &[(&str, RowRule)] = &[("primary", parse_primary), ("fallback", parse_fallback)];

/// Primary rule: the full structured row with trailing quantity and label
/// number. Fails on format drift (missing optional columns).
pub fn parse_primary(block: &str) -> Option<ParsedRow> {
    let caps = PRIMARY_ROW.captures(block)?;
    Some(ParsedRow {
        product_name: strip_leading_noise(&caps["name"]),
        article: caps["article"].to_string(),
    })
}

/// Fallback rule: the first article-shaped token is the article, everything
/// before it is the product name.
pub fn parse_fallback(block: &str) -> Option<ParsedRow> {
    let m = ARTICLE_TOKEN.find(block)?;
    Some(ParsedRow {
        product_name: strip_leading_noise(&block[..m.start()]),
        article: m.as_str().to_string(),
    })
}

/// Strip any leading run of digits and whitespace from a product name.
pub fn strip_leading_noise(name: &str) -> String {
    LEADING_NOISE.replace(name, "").trim_end().to_string()
}

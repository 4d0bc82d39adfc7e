//! Whitespace normalization the document digest is computed over.
//!
//! This is not XML-C14N. It is the narrow textual rewrite the SRI validators reproduce, and the
//! signature is spliced into its output, so the rules below must not change.
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static BREAK_AROUND_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<open>>)\r?\n|\r?\n(?P<close></)").expect("line break regex")
});
static SPACE_AFTER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+").expect("space after tag regex"));

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Canonicalizes `xml` into the form both the primary digest and the splice operate on.
///
/// Idempotent: `canonicalize(&canonicalize(x)) == canonicalize(x)`.
/// A leading byte order mark is dropped along with leading whitespace.
pub fn canonicalize(xml: &str) -> String {
    let xml = xml.trim_start_matches(|c: char| c == BYTE_ORDER_MARK || c.is_whitespace());
    let collapsed = WHITESPACE_RUN.replace_all(xml, " ");
    let without_breaks = BREAK_AROUND_TAG.replace_all(collapsed.trim(), "${open}${close}");
    let tight = SPACE_AFTER_TAG.replace_all(without_breaks.trim(), ">");
    tight
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\t' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

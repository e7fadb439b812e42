use std::sync::OnceLock;

use billscan_core::Amount;
use regex::Regex;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

/// Separator, optional currency marker, then the amount itself.
const LABEL_TAIL: &str = r"\s*[:\-]?\s*(?:Rs\.?|रु\.?|NPR|₹)?\s*([0-9][0-9,]*\.?[0-9]{0,2})";

/// Total labels, highest priority first.
const TOTAL_LABELS: [(&str, &str); 6] = [
    ("gross amount", r"gross\s*amount"),
    ("net amount", r"net\s*amount"),
    ("total amount", r"total\s*amount"),
    ("amount due", r"amount\s*due"),
    ("grand total", r"grand\s*total"),
    ("total", r"total"),
];

re!(re_decimal_amount, r"[0-9][0-9,]*\.[0-9]{2}");

// ── Labeled totals ────────────────────────────────────────────────────────────

/// One keyword of the labeled-total search.
pub struct LabeledTotalMatcher {
    pub label: &'static str,
    regex: Regex,
}

impl LabeledTotalMatcher {
    fn new(label: &'static str, keyword: &str) -> Self {
        let regex = Regex::new(&format!("(?i){keyword}{LABEL_TAIL}")).expect("invalid regex");
        Self { label, regex }
    }

    /// Byte offset and captured amount of the first match.
    fn find<'t>(&self, text: &'t str) -> Option<(usize, &'t str)> {
        let caps = self.regex.captures(text)?;
        let start = caps.get(0)?.start();
        Some((start, caps.get(1)?.as_str()))
    }
}

/// The matchers in priority order.
pub fn total_matchers() -> &'static [LabeledTotalMatcher] {
    static M: OnceLock<Vec<LabeledTotalMatcher>> = OnceLock::new();
    M.get_or_init(|| {
        TOTAL_LABELS
            .iter()
            .map(|(label, keyword)| LabeledTotalMatcher::new(label, keyword))
            .collect()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledTotal {
    pub label: &'static str,
    pub amount: String,
}

/// The labeled total that comes first in reading order. When two labels
/// start at the same offset ("Total Amount" vs "Total") the higher-priority
/// one wins.
pub fn find_labeled_total(text: &str) -> Option<LabeledTotal> {
    total_matchers()
        .iter()
        .enumerate()
        .filter_map(|(priority, m)| m.find(text).map(|(start, amount)| (start, priority, m.label, amount)))
        .min_by_key(|&(start, priority, _, _)| (start, priority))
        .map(|(_, _, label, amount)| LabeledTotal { label, amount: normalize_amount(amount) })
}

/// Drop surrounding whitespace and a dangling decimal point (`"1,234."`).
fn normalize_amount(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_string()
}

// ── Fallback ─────────────────────────────────────────────────────────────────

/// Largest two-decimal figure anywhere in the text, formatted with two
/// decimals and no separators. A token that won't parse as a decimal makes
/// the whole fallback degrade to the first raw token.
pub fn largest_decimal_amount(text: &str) -> Option<String> {
    let tokens: Vec<&str> = re_decimal_amount().find_iter(text).map(|m| m.as_str()).collect();
    let first = *tokens.first()?;
    let parsed: Result<Vec<Amount>, _> = tokens.iter().map(|t| Amount::parse(t)).collect();
    match parsed {
        Ok(amounts) => amounts.into_iter().max().map(|a| a.to_string()),
        Err(e) => {
            tracing::debug!(error = %e, token = first, "falling back to raw amount token");
            Some(first.to_string())
        }
    }
}

// ── Public extraction API ─────────────────────────────────────────────────────

/// Detected invoice total, or an empty string when there is none.
pub fn extract_total(text: &str) -> String {
    if let Some(labeled) = find_labeled_total(text) {
        if !labeled.amount.is_empty() {
            return labeled.amount;
        }
    }
    largest_decimal_amount(text).unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use std::sync::OnceLock;

use billscan_core::LineItemRecord;
use regex::Regex;

/// Lines containing any of these (case-insensitive) are bookkeeping, not items.
pub const RESERVED_KEYWORDS: [&str; 6] = ["TOTAL", "AMOUNT DUE", "CHANGE", "CASH", "RECEIPT", "SUBTOTAL"];

fn re_numeric_token() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[\d,.]+").expect("invalid regex"))
}

/// Split recognized text into line items, one candidate per physical line.
pub fn segment_lines(text: &str, file_label: &str) -> Vec<LineItemRecord> {
    text.lines().filter_map(|line| parse_line(line, file_label)).collect()
}

/// Classify a single line. `None` for blank lines, reserved-keyword lines,
/// and lines lacking either numbers or a description.
pub fn parse_line(line: &str, file_label: &str) -> Option<LineItemRecord> {
    let line = line.trim();
    if line.is_empty() || is_reserved(line) {
        return None;
    }

    let numbers: Vec<&str> = re_numeric_token().find_iter(line).map(|m| m.as_str()).collect();
    let description = re_numeric_token().replace_all(line, "");
    let description = description.trim();
    if numbers.is_empty() || description.is_empty() {
        return None;
    }

    // 2 tokens reads as "price total", 3+ as "qty price ... total".
    let (quantity, unit_price) = match numbers.as_slice() {
        [_] => ("", ""),
        [price, _] => ("", *price),
        [qty, price, ..] => (*qty, *price),
        [] => return None,
    };
    let line_total = numbers.last().copied().unwrap_or_default();

    Some(LineItemRecord {
        file: file_label.to_string(),
        item: description.to_string(),
        quantity: quantity.to_string(),
        unit_price: unit_price.to_string(),
        line_total: line_total.to_string(),
    })
}

fn is_reserved(line: &str) -> bool {
    let upper = line.to_uppercase();
    RESERVED_KEYWORDS.iter().any(|kw| upper.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(line: &str) -> Option<LineItemRecord> {
        parse_line(line, "inv.png")
    }

    #[test]
    fn three_tokens_fill_every_field() {
        let item = one("Milk 2 50.00 100.00").unwrap();
        assert_eq!(item.file, "inv.png");
        assert_eq!(item.item, "Milk");
        assert_eq!(item.quantity, "2");
        assert_eq!(item.unit_price, "50.00");
        assert_eq!(item.line_total, "100.00");
    }

    #[test]
    fn two_tokens_are_price_and_total() {
        let item = one("Bread 40.00 40.00").unwrap();
        assert_eq!(item.quantity, "");
        assert_eq!(item.unit_price, "40.00");
        assert_eq!(item.line_total, "40.00");
    }

    #[test]
    fn single_token_is_the_total() {
        let item = one("Delivery charge 150").unwrap();
        assert_eq!(item.item, "Delivery charge");
        assert_eq!(item.quantity, "");
        assert_eq!(item.unit_price, "");
        assert_eq!(item.line_total, "150");
    }

    #[test]
    fn extra_tokens_only_move_the_total() {
        let item = one("Rice 5 kg 120.00 10 600.00").unwrap();
        assert_eq!(item.item, "Rice  kg");
        assert_eq!(item.quantity, "5");
        assert_eq!(item.unit_price, "120.00");
        assert_eq!(item.line_total, "600.00");
    }

    #[test]
    fn reserved_keyword_lines_are_skipped() {
        assert!(one("SUBTOTAL 100.00").is_none());
        assert!(one("Grand total 100.00").is_none());
        assert!(one("Amount Due 12").is_none());
        assert!(one("Cash 500.00").is_none());
        assert!(one("Change 20.00").is_none());
        assert!(one("Receipt No 4471").is_none());
        // substring match, not word match
        assert!(one("Exchange fee 5.00").is_none());
    }

    #[test]
    fn lines_without_numbers_or_description_are_skipped() {
        assert!(one("Thank you for shopping").is_none());
        assert!(one("12.00 3 36.00").is_none());
        assert!(one("   ").is_none());
    }

    #[test]
    fn tokens_pass_through_unvalidated() {
        let item = one("Widget 1,2.3 ... 7").unwrap();
        assert_eq!(item.quantity, "1,2.3");
        assert_eq!(item.unit_price, "...");
        assert_eq!(item.line_total, "7");
        assert_eq!(item.item, "Widget");
    }

    #[test]
    fn segment_keeps_line_order() {
        let text = "ACME STORE\nMilk 2 50.00 100.00\n\nTOTAL 160.00\nEggs 12 5.00 60.00\nThank you";
        let items = segment_lines(text, "a.jpg");
        let names: Vec<_> = items.iter().map(|i| i.item.as_str()).collect();
        assert_eq!(names, ["Milk", "Eggs"]);
        assert!(items.iter().all(|i| i.file == "a.jpg"));
    }

    #[test]
    fn segment_empty_text() {
        assert!(segment_lines("", "a.jpg").is_empty());
    }
}

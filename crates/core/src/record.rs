use serde::Serialize;

/// One row of the per-file summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    #[serde(rename = "File")]
    pub file: String,
    /// Detected total; empty when nothing was found.
    #[serde(rename = "Total Amount")]
    pub total_amount: String,
}

impl SummaryRecord {
    pub const HEADERS: [&'static str; 2] = ["File", "Total Amount"];

    pub fn new(file: impl Into<String>, total_amount: impl Into<String>) -> Self {
        Self { file: file.into(), total_amount: total_amount.into() }
    }

    pub fn has_total(&self) -> bool {
        !self.total_amount.is_empty()
    }
}

/// One purchasable entry recognized on an invoice.
///
/// Fields are passed through exactly as they were matched in the text;
/// `quantity` and `unit_price` may be empty, `item` and `line_total` never are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemRecord {
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Item")]
    pub item: String,
    #[serde(rename = "Quantity")]
    pub quantity: String,
    #[serde(rename = "Unit Price")]
    pub unit_price: String,
    #[serde(rename = "Line Total")]
    pub line_total: String,
}

impl LineItemRecord {
    pub const HEADERS: [&'static str; 5] = ["File", "Item", "Quantity", "Unit Price", "Line Total"];
}

/// The two output tables of a batch run.
///
/// Summaries are appended in processing order, which is file-name order;
/// line items follow file-encounter then within-file line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub summaries: Vec<SummaryRecord>,
    pub line_items: Vec<LineItemRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append everything one file contributed.
    pub fn push_file(&mut self, summary: SummaryRecord, items: Vec<LineItemRecord>) {
        self.summaries.push(summary);
        self.line_items.extend(items);
    }

    pub fn file_count(&self) -> usize {
        self.summaries.len()
    }

    pub fn line_item_count(&self) -> usize {
        self.line_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.line_items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(file: &str, name: &str) -> LineItemRecord {
        LineItemRecord {
            file: file.into(),
            item: name.into(),
            quantity: String::new(),
            unit_price: String::new(),
            line_total: "1.00".into(),
        }
    }

    #[test]
    fn push_file_keeps_encounter_order() {
        let mut rs = ResultSet::new();
        rs.push_file(SummaryRecord::new("a.png", "10.00"), vec![item("a.png", "Tea"), item("a.png", "Milk")]);
        rs.push_file(SummaryRecord::new("b.png", ""), vec![]);
        rs.push_file(SummaryRecord::new("c.png", "3.00"), vec![item("c.png", "Bread")]);

        assert_eq!(rs.file_count(), 3);
        assert_eq!(rs.line_item_count(), 3);
        let names: Vec<_> = rs.line_items.iter().map(|i| i.item.as_str()).collect();
        assert_eq!(names, ["Tea", "Milk", "Bread"]);
        assert!(!rs.summaries[1].has_total());
    }

    #[test]
    fn empty_result_set() {
        assert!(ResultSet::new().is_empty());
    }
}

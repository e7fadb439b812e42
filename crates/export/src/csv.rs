use billscan_core::{LineItemRecord, ResultSet, SummaryRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// File names of the two tables inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputFiles {
    pub summary_file: String,
    pub line_items_file: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            summary_file: "invoices_summary.csv".to_string(),
            line_items_file: "invoice_line_items.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub summary_path: PathBuf,
    pub summary_rows: usize,
    /// `None` when there were no line items and the file was not written.
    pub line_items_path: Option<PathBuf>,
    pub line_item_rows: usize,
}

/// Write the summary table. The header is written even when `records` is empty.
pub fn write_summary<W: Write>(writer: W, records: &[SummaryRecord]) -> Result<(), ExportError> {
    write_table(writer, &SummaryRecord::HEADERS, records)
}

pub fn write_line_items<W: Write>(writer: W, records: &[LineItemRecord]) -> Result<(), ExportError> {
    write_table(writer, &LineItemRecord::HEADERS, records)
}

fn write_table<W: Write, T: Serialize>(
    writer: W,
    headers: &[&str],
    records: &[T],
) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(headers)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write both tables into `out_dir`, creating it if needed. The line-item
/// file is skipped entirely when there are no items.
pub fn export_result_set(
    out_dir: &Path,
    results: &ResultSet,
    files: &OutputFiles,
) -> Result<ExportReport, ExportError> {
    std::fs::create_dir_all(out_dir)?;

    let summary_path = out_dir.join(&files.summary_file);
    write_summary(File::create(&summary_path)?, &results.summaries)?;
    tracing::debug!(path = %summary_path.display(), rows = results.file_count(), "wrote summary");

    let line_items_path = if results.line_items.is_empty() {
        None
    } else {
        let path = out_dir.join(&files.line_items_file);
        write_line_items(File::create(&path)?, &results.line_items)?;
        tracing::debug!(path = %path.display(), rows = results.line_item_count(), "wrote line items");
        Some(path)
    };

    Ok(ExportReport {
        summary_path,
        summary_rows: results.file_count(),
        line_items_path,
        line_item_rows: results.line_item_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milk() -> LineItemRecord {
        LineItemRecord {
            file: "a.png".into(),
            item: "Milk".into(),
            quantity: "2".into(),
            unit_price: "50.00".into(),
            line_total: "100.00".into(),
        }
    }

    fn to_string(f: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut buf = Vec::new();
        f(&mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn summary_quotes_thousands_separator() {
        let out = to_string(|buf| {
            write_summary(
                buf,
                &[SummaryRecord::new("a.png", "1,234.50"), SummaryRecord::new("b.png", "")],
            )
            .unwrap()
        });
        assert_eq!(out, "File,Total Amount\na.png,\"1,234.50\"\nb.png,\n");
    }

    #[test]
    fn empty_summary_still_has_header() {
        let out = to_string(|buf| write_summary(buf, &[]).unwrap());
        assert_eq!(out, "File,Total Amount\n");
    }

    #[test]
    fn line_items_columns() {
        let out = to_string(|buf| write_line_items(buf, &[milk()]).unwrap());
        assert_eq!(
            out,
            "File,Item,Quantity,Unit Price,Line Total\na.png,Milk,2,50.00,100.00\n"
        );
    }

    #[test]
    fn export_creates_dir_and_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("outputs").join("run");
        let mut results = ResultSet::new();
        results.push_file(SummaryRecord::new("a.png", "100.00"), vec![milk()]);

        let report = export_result_set(&out_dir, &results, &OutputFiles::default()).unwrap();

        assert_eq!(report.summary_path, out_dir.join("invoices_summary.csv"));
        assert_eq!(report.summary_rows, 1);
        assert_eq!(report.line_items_path, Some(out_dir.join("invoice_line_items.csv")));
        assert_eq!(report.line_item_rows, 1);
        let items = std::fs::read_to_string(out_dir.join("invoice_line_items.csv")).unwrap();
        assert!(items.ends_with("a.png,Milk,2,50.00,100.00\n"));
    }

    #[test]
    fn export_skips_empty_line_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut results = ResultSet::new();
        results.push_file(SummaryRecord::new("a.png", ""), vec![]);
        let files = OutputFiles { summary_file: "s.csv".into(), line_items_file: "i.csv".into() };

        let report = export_result_set(dir.path(), &results, &files).unwrap();

        assert!(report.line_items_path.is_none());
        assert!(dir.path().join("s.csv").exists());
        assert!(!dir.path().join("i.csv").exists());
    }

    #[test]
    fn output_dir_blocked_by_a_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("outputs");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = export_result_set(&blocker, &ResultSet::new(), &OutputFiles::default()).unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
    }
}

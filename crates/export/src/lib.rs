pub mod csv;

pub use crate::csv::{export_result_set, write_line_items, write_summary, ExportError, ExportReport, OutputFiles};

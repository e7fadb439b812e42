use anyhow::{Context, Result};
use billscan_core::ResultSet;
use billscan_export::{export_result_set, ExportReport};
use billscan_ocr::{FileFailure, InvoicePipeline, OcrBackend};

use crate::config::AppConfig;

/// What a finished run hands back to the operator.
#[derive(Debug)]
pub struct RunReport {
    pub export: ExportReport,
    pub failures: Vec<FileFailure>,
}

/// Run the whole batch with the engine selected at build time.
pub async fn run_batch(config: &AppConfig) -> Result<RunReport> {
    process_and_export(build_recognizer(config), config).await
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(config: &AppConfig) -> billscan_ocr::TesseractCli {
    let cli = billscan_ocr::TesseractCli::new(config.ocr.clone());
    if let Some(program) = cli.program() {
        tracing::debug!(program = %program.display(), "using tesseract executable");
    }
    cli
}

#[cfg(feature = "tesseract")]
fn build_recognizer(config: &AppConfig) -> billscan_ocr::recognizer::tesseract_backend::LeptessRecognizer {
    if let Some(cmd) = &config.ocr.tesseract_cmd {
        tracing::warn!(
            cmd = %cmd.display(),
            "ignoring tesseract executable: built with in-process libtesseract (set ocr.tessdata_dir instead)"
        );
    }
    billscan_ocr::recognizer::tesseract_backend::LeptessRecognizer::new(&config.ocr)
}

/// Precheck the engine, process the input folder, write the CSV tables.
pub async fn process_and_export<R: OcrBackend + 'static>(
    recognizer: R,
    config: &AppConfig,
) -> Result<RunReport> {
    let pipeline = InvoicePipeline::new(recognizer, config.batch_config());
    let outcome = pipeline
        .process_folder(&config.input_dir)
        .await
        .context("Batch aborted")?;

    log_totals(&outcome.results, outcome.failures.len());

    let export = export_result_set(&config.output_dir, &outcome.results, &config.output)
        .with_context(|| format!("Failed to write CSV output to {}", config.output_dir.display()))?;

    Ok(RunReport { export, failures: outcome.failures })
}

fn log_totals(results: &ResultSet, failed: usize) {
    let with_total = results.summaries.iter().filter(|s| s.has_total()).count();
    tracing::info!(
        files = results.file_count(),
        with_total,
        line_items = results.line_item_count(),
        failed,
        "batch finished"
    );
}

pub fn print_report(report: &RunReport) {
    let export = &report.export;
    println!("\nDone");
    println!("- Summary CSV: {} ({} files)", export.summary_path.display(), export.summary_rows);
    match &export.line_items_path {
        Some(path) => println!("- Line Items CSV: {} ({} rows)", path.display(), export.line_item_rows),
        None => println!("- Line Items CSV: not written (no line items detected)"),
    }
    if !report.failures.is_empty() {
        println!("- Skipped {} file(s):", report.failures.len());
        for failure in &report.failures {
            println!("    {}: {}", failure.file, failure.cause);
        }
    }
}

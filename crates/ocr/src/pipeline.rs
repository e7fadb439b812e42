use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use billscan_core::{LineItemRecord, ResultSet, SummaryRecord};
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinError;

use crate::extract::extract_total;
use crate::preprocess::{self, ConditionParams};
use crate::recognizer::{OcrBackend, OcrError};
use crate::segment::segment_lines;

/// File-name suffixes picked up from the input folder (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".tif", ".tiff", ".bmp"];

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(OcrError),
    #[error("Unexpected fault: {0}")]
    Fault(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub extensions: Vec<String>,
    pub condition: ConditionParams,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            condition: ConditionParams::default(),
        }
    }
}

impl BatchConfig {
    pub fn is_supported(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(&ext.to_lowercase()))
    }
}

/// What a single file produced.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub summary: SummaryRecord,
    pub items: Vec<LineItemRecord>,
    /// Raw OCR text output.
    pub ocr_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file: String,
    pub cause: String,
}

#[derive(Debug)]
pub enum FileOutcome {
    Processed(FileReport),
    Failed(FileFailure),
}

/// The result tables plus every file that had to be skipped.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: ResultSet,
    pub failures: Vec<FileFailure>,
}

impl BatchOutcome {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Processed(report) => self.results.push_file(report.summary, report.items),
            FileOutcome::Failed(failure) => self.failures.push(failure),
        }
    }
}

/// Orchestrates, per file: read → condition → OCR → extract total → segment items.
///
/// Files are handled strictly one after another. A failing file is logged and
/// skipped; only an unavailable OCR engine or an unreadable input directory
/// stops a batch.
pub struct InvoicePipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    config: BatchConfig,
}

impl<R: OcrBackend + 'static> InvoicePipeline<R> {
    pub fn new(recognizer: R, config: BatchConfig) -> Self {
        Self { recognizer: Arc::new(recognizer), config }
    }

    /// Supported image files directly inside `dir`, sorted by file name.
    pub async fn discover_images(&self, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let mut found: Vec<(OsString, PathBuf)> = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !self.config.is_supported(&name.to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            if is_directory(&entry).await {
                tracing::debug!(path = %path.display(), "skipping directory");
                continue;
            }
            // Anything else that matches is kept; an unreadable entry fails on its own.
            found.push((name, path));
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    /// Process every supported image in `dir`.
    pub async fn process_folder(&self, dir: &Path) -> Result<BatchOutcome, PipelineError> {
        self.recognizer
            .ensure_available()
            .map_err(PipelineError::OcrUnavailable)?;

        let files = self.discover_images(dir).await?;
        tracing::debug!(dir = %dir.display(), count = files.len(), "discovered images");

        let mut outcome = BatchOutcome::default();
        for path in files {
            outcome.record(self.process_isolated(&path).await);
        }
        Ok(outcome)
    }

    async fn process_isolated(&self, path: &Path) -> FileOutcome {
        match self.process_file(path).await {
            Ok(report) => {
                tracing::info!(
                    file = %report.summary.file,
                    line_items = report.items.len(),
                    "processed invoice"
                );
                FileOutcome::Processed(report)
            }
            Err(e) => {
                let file = file_label(path);
                tracing::error!(file = %file, error = %e, "skipping invoice");
                FileOutcome::Failed(FileFailure { file, cause: e.to_string() })
            }
        }
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<FileReport, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.process_bytes(bytes, &file_label(path)).await
    }

    /// Process already-read image bytes. `file_label` ends up in every record.
    ///
    /// Conditioning and recognition run on the blocking pool; a panic in
    /// either is reported as [`PipelineError::Fault`].
    pub async fn process_bytes(
        &self,
        data: Vec<u8>,
        file_label: &str,
    ) -> Result<FileReport, PipelineError> {
        let recognizer = Arc::clone(&self.recognizer);
        let params = self.config.condition.clone();

        let ocr_text = tokio::task::spawn_blocking(move || -> Result<String, PipelineError> {
            let image_bytes = preprocess::prepare_for_ocr_from_bytes(&data, &params)?;
            Ok(recognizer.recognize(&image_bytes)?)
        })
        .await
        .map_err(fault)??;

        let summary = SummaryRecord::new(file_label, extract_total(&ocr_text));
        let items = segment_lines(&ocr_text, file_label);
        Ok(FileReport { summary, items, ocr_text })
    }
}

/// Directories, and symlinks that resolve to one. A link that cannot be
/// resolved is not a directory.
async fn is_directory(entry: &tokio::fs::DirEntry) -> bool {
    match entry.file_type().await {
        Ok(ft) if ft.is_dir() => true,
        Ok(ft) if ft.is_symlink() => tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false),
        _ => false,
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn fault(err: JoinError) -> PipelineError {
    if !err.is_panic() {
        return PipelineError::Fault(err.to_string());
    }
    let payload = err.into_panic();
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string());
    PipelineError::Fault(msg)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use anyhow::{bail, Context, Result};
use billscan_export::OutputFiles;
use billscan_ocr::{BatchConfig, ConditionParams, OcrOptions, SUPPORTED_EXTENSIONS};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Everything a batch run needs. Every field has a default, so an empty
/// (or missing) config file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extensions: Vec<String>,
    pub ocr: OcrOptions,
    pub condition: ConditionParams,
    pub output: OutputFiles,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("invoices"),
            output_dir: PathBuf::from("outputs"),
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ocr: OcrOptions::default(),
            condition: ConditionParams::default(),
            output: OutputFiles::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// `explicit` must exist; otherwise the per-user config file is used when
    /// present, and defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };
        tracing::debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Command-line flags win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(input) = &cli.input {
            self.input_dir = input.clone();
        }
        if let Some(out) = &cli.out {
            self.output_dir = out.clone();
        }
        if let Some(cmd) = &cli.tesseract {
            self.ocr.tesseract_cmd = Some(cmd.clone());
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.condition.validate()?;
        if self.extensions.is_empty() {
            bail!("`extensions` must list at least one file suffix");
        }
        if self.output.summary_file.is_empty() || self.output.line_items_file.is_empty() {
            bail!("output file names must not be empty");
        }
        Ok(())
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig { extensions: self.extensions.clone(), condition: self.condition.clone() }
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "billscan", "billscan")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options forwarded to the engine untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OcrOptions {
    /// Explicit engine binary; falls back to `tesseract` on `PATH`.
    pub tesseract_cmd: Option<PathBuf>,
    pub engine_mode: u8,
    pub page_seg_mode: u8,
    pub language: Option<String>,
    /// `tessdata` directory; the engine's built-in location when unset.
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            tesseract_cmd: None,
            engine_mode: 3,
            page_seg_mode: 6,
            language: None,
            tessdata_dir: None,
        }
    }
}

/// Abstraction over an OCR backend.
/// Implementations accept encoded (PNG) image bytes and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;

    /// Checked once before a batch starts; an error here is fatal.
    fn ensure_available(&self) -> Result<(), OcrError> {
        Ok(())
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string, useful for unit testing the extraction pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
    pub available: bool,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), available: true }
    }

    /// A backend whose availability check fails.
    pub fn unavailable() -> Self {
        Self { text: String::new(), available: false }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }

    fn ensure_available(&self) -> Result<(), OcrError> {
        if self.available {
            Ok(())
        } else {
            Err(OcrError::NotAvailable("mock backend disabled".into()))
        }
    }
}

// ── Tesseract command-line backend ────────────────────────────────────────────

/// Runs the `tesseract` executable once per image.
pub struct TesseractCli {
    program: Option<PathBuf>,
    options: OcrOptions,
}

impl TesseractCli {
    /// Resolve the executable: the configured path if it exists, otherwise
    /// `tesseract` from the search path.
    pub fn new(options: OcrOptions) -> Self {
        let program = options
            .tesseract_cmd
            .clone()
            .filter(|p| p.exists())
            .or_else(|| which::which("tesseract").ok());
        Self { program, options }
    }

    pub fn program(&self) -> Option<&std::path::Path> {
        self.program.as_deref()
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "stdout".to_string(),
            "--oem".to_string(),
            self.options.engine_mode.to_string(),
            "--psm".to_string(),
            self.options.page_seg_mode.to_string(),
        ];
        if let Some(lang) = &self.options.language {
            args.push("-l".to_string());
            args.push(lang.clone());
        }
        if let Some(dir) = &self.options.tessdata_dir {
            args.push("--tessdata-dir".to_string());
            args.push(dir.display().to_string());
        }
        args
    }
}

impl OcrBackend for TesseractCli {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        use std::io::Write;

        let program = self.program.as_ref().ok_or_else(|| not_found(&self.options))?;

        let mut input = tempfile::Builder::new().prefix("billscan-").suffix(".png").tempfile()?;
        input.write_all(image_bytes)?;
        input.flush()?;

        tracing::debug!(program = %program.display(), args = ?self.args(), "running tesseract");
        let output = std::process::Command::new(program)
            .arg(input.path())
            .args(self.args())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::Engine(format!("tesseract exited with {}: {}", output.status, stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(&self.options)),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    fn ensure_available(&self) -> Result<(), OcrError> {
        match self.program {
            Some(_) => Ok(()),
            None => Err(not_found(&self.options)),
        }
    }
}

fn not_found(options: &OcrOptions) -> OcrError {
    let msg = match &options.tesseract_cmd {
        Some(p) => format!("{} does not exist and `tesseract` is not on PATH", p.display()),
        None => "`tesseract` is not on PATH (install tesseract-ocr)".to_string(),
    };
    OcrError::NotAvailable(msg)
}

// ── libtesseract backend (optional, gated behind `tesseract` feature) ─────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, OcrOptions};
    use leptess::{LepTess, Variable};

    /// In-process Tesseract through `leptess`. The engine mode is fixed at
    /// init time by the library, so only the page segmentation mode is forwarded.
    pub struct LeptessRecognizer {
        data_path: Option<String>,
        lang: String,
        page_seg_mode: String,
    }

    impl LeptessRecognizer {
        pub fn new(options: &OcrOptions) -> Self {
            Self {
                data_path: options.tessdata_dir.as_ref().map(|p| p.display().to_string()),
                lang: options.language.clone().unwrap_or_else(|| "eng".to_string()),
                page_seg_mode: options.page_seg_mode.to_string(),
            }
        }

        fn engine(&self) -> Result<LepTess, OcrError> {
            LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::NotAvailable(e.to_string()))
        }
    }

    impl OcrBackend for LeptessRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            let mut lt = self.engine()?;
            lt.set_variable(Variable::TesseditPagesegMode, &self.page_seg_mode)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }

        fn ensure_available(&self) -> Result<(), OcrError> {
            self.engine().map(|_| ())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::new("STORE\nMilk 2 50.00 100.00\nTotal 100.00");
        assert_eq!(
            r.recognize(b"fake image data").unwrap(),
            "STORE\nMilk 2 50.00 100.00\nTotal 100.00"
        );
        assert!(r.ensure_available().is_ok());
    }

    #[test]
    fn mock_unavailable_fails_precheck() {
        let r = MockRecognizer::unavailable();
        assert!(matches!(r.ensure_available(), Err(OcrError::NotAvailable(_))));
    }

    #[test]
    fn default_options_forward_fixed_modes() {
        let opts = OcrOptions::default();
        assert_eq!(opts.engine_mode, 3);
        assert_eq!(opts.page_seg_mode, 6);
        assert!(opts.tesseract_cmd.is_none());
    }

    #[test]
    fn cli_args_include_modes_and_language() {
        let cli = TesseractCli {
            program: None,
            options: OcrOptions { language: Some("eng+nep".into()), ..OcrOptions::default() },
        };
        assert_eq!(cli.args(), ["stdout", "--oem", "3", "--psm", "6", "-l", "eng+nep"]);
    }

    #[test]
    fn cli_args_forward_tessdata_dir() {
        let cli = TesseractCli {
            program: None,
            options: OcrOptions {
                tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
                ..OcrOptions::default()
            },
        };
        assert_eq!(cli.args(), ["stdout", "--oem", "3", "--psm", "6", "--tessdata-dir", "/opt/tessdata"]);
    }

    #[test]
    fn cli_without_program_is_unavailable() {
        let cli = TesseractCli { program: None, options: OcrOptions::default() };
        assert!(matches!(cli.ensure_available(), Err(OcrError::NotAvailable(_))));
        assert!(matches!(cli.recognize(b"png"), Err(OcrError::NotAvailable(_))));
    }

    #[test]
    fn configured_path_that_exists_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("tesseract-custom");
        std::fs::write(&fake, b"").unwrap();
        let cli = TesseractCli::new(OcrOptions { tesseract_cmd: Some(fake.clone()), ..OcrOptions::default() });
        assert_eq!(cli.program(), Some(fake.as_path()));
        assert!(cli.ensure_available().is_ok());
    }
}

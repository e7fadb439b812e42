pub mod extract;
pub mod filters;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod segment;

pub use extract::{extract_total, find_labeled_total, largest_decimal_amount, LabeledTotal};
pub use pipeline::{
    BatchConfig, BatchOutcome, FileFailure, FileOutcome, FileReport, InvoicePipeline, PipelineError,
    SUPPORTED_EXTENSIONS,
};
pub use preprocess::{condition, prepare_for_ocr, ConditionParams, InvalidParam, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, OcrOptions, TesseractCli};
pub use segment::{parse_line, segment_lines};

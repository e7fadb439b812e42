use clap::Parser;
use std::path::PathBuf;

/// Extract totals and line items from a folder of scanned invoices into CSV.
#[derive(Debug, Parser)]
#[command(name = "billscan", version)]
pub struct Cli {
    /// Folder containing the invoice images [default: invoices]
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Folder the CSV tables are written to [default: outputs]
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// TOML config file (defaults to the platform config dir if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the tesseract executable
    #[arg(long)]
    pub tesseract: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

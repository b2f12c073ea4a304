use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "toccheck",
    version,
    about = "TOC extraction and cross-validation for paginated specification PDFs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Reconcile(ReconcileArgs),
    Run(RunArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub pdf_path: PathBuf,

    #[arg(long)]
    pub doc_title: Option<String>,

    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub toc_path: Option<PathBuf>,

    #[arg(long)]
    pub sections_path: Option<PathBuf>,

    #[arg(long)]
    pub metadata_path: Option<PathBuf>,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub toc_path: Option<PathBuf>,

    #[arg(long)]
    pub sections_path: Option<PathBuf>,

    #[arg(long)]
    pub metadata_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long)]
    pub pdf_path: PathBuf,

    #[arg(long)]
    pub doc_title: Option<String>,

    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub toc_path: Option<PathBuf>,

    #[arg(long)]
    pub sections_path: Option<PathBuf>,

    #[arg(long)]
    pub metadata_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub metadata_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

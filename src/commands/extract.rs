use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ExtractArgs;
use crate::model::{BodyCounts, RunMetadata, SectionEntry};
use crate::pdf::{OcrEngine, PageSource, PdfPages, TesseractOcr, ocr_tools_available};
use crate::sections::SectionScanner;
use crate::tally::TallyScanner;
use crate::toc::TocParser;
use crate::util::{now_utc_string, sha256_file, write_json_pretty, write_jsonl};

pub struct Extraction {
    pub toc_entries: Vec<SectionEntry>,
    pub body_entries: Vec<SectionEntry>,
    pub counts: BodyCounts,
    pub metadata: RunMetadata,
}

pub struct ArtifactPaths {
    pub toc_path: PathBuf,
    pub sections_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl ArtifactPaths {
    pub fn resolve(args: &ExtractArgs) -> Self {
        Self {
            toc_path: args
                .toc_path
                .clone()
                .unwrap_or_else(|| args.out_dir.join("toc.jsonl")),
            sections_path: args
                .sections_path
                .clone()
                .unwrap_or_else(|| args.out_dir.join("sections.jsonl")),
            metadata_path: args
                .metadata_path
                .clone()
                .unwrap_or_else(|| args.out_dir.join("metadata.json")),
        }
    }
}

pub fn run(args: ExtractArgs) -> Result<()> {
    extract_document(&args)?;
    Ok(())
}

pub fn extract_document(args: &ExtractArgs) -> Result<Extraction> {
    let paths = ArtifactPaths::resolve(args);
    let doc_title = args.doc_title.clone().unwrap_or_else(|| {
        args.pdf_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("document")
            .to_string()
    });

    info!(pdf = %args.pdf_path.display(), doc_title = %doc_title, "opening document");
    let pages = PdfPages::open(&args.pdf_path, args.max_pages)?;
    info!(total_pages = pages.page_count(), "loaded page text");

    let ocr = if ocr_tools_available() {
        Some(TesseractOcr::new(&args.ocr_lang))
    } else {
        warn!("pdftoppm or tesseract unavailable; empty pages will not be OCRed");
        None
    };
    let ocr_ref = ocr.as_ref().map(|engine| engine as &dyn OcrEngine);

    extract_and_persist(&pages, ocr_ref, &doc_title, &args.pdf_path, &paths)
}

pub fn extract_and_persist(
    source: &dyn PageSource,
    ocr: Option<&dyn OcrEngine>,
    doc_title: &str,
    pdf_path: &Path,
    paths: &ArtifactPaths,
) -> Result<Extraction> {
    let toc_parser = TocParser::new()?;
    let range = toc_parser.locate(source)?;
    info!(
        toc_start = range.start_page,
        toc_end = range.end_page,
        "located TOC range"
    );

    let toc_entries = toc_parser.extract(source, range, doc_title)?;
    write_jsonl(&paths.toc_path, &toc_entries)?;
    info!(
        toc_entries = toc_entries.len(),
        path = %paths.toc_path.display(),
        "wrote TOC entries"
    );

    let toc_ids: HashSet<String> = toc_entries
        .iter()
        .map(|entry| entry.section_id.clone())
        .collect();

    let scanner = SectionScanner::new()?;
    let body_entries = scanner.extract(source, range, &toc_ids, doc_title)?;
    write_jsonl(&paths.sections_path, &body_entries)?;
    info!(
        body_entries = body_entries.len(),
        path = %paths.sections_path.display(),
        "wrote body entries"
    );

    let tally = TallyScanner::new()?;
    let counts = tally.count(source, range, ocr)?;
    info!(
        tables = counts.tables_in_body,
        figures = counts.figures_in_body,
        "tallied tables and figures"
    );

    let metadata = RunMetadata {
        doc_title: doc_title.to_string(),
        pdf_path: pdf_path.display().to_string(),
        total_pages: source.page_count(),
        toc_start: range.start_page,
        toc_end: range.end_page,
        tables_in_body: counts.tables_in_body,
        figures_in_body: counts.figures_in_body,
        source_sha256: sha256_file(pdf_path)?,
        generated_at: now_utc_string(),
    };
    write_json_pretty(&paths.metadata_path, &metadata)?;
    info!(path = %paths.metadata_path.display(), "wrote run metadata");

    Ok(Extraction {
        toc_entries,
        body_entries,
        counts,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::StaticPages;
    use crate::util::read_jsonl;
    use anyhow::bail;

    struct GridFailPages(StaticPages);

    impl PageSource for GridFailPages {
        fn page_count(&self) -> usize {
            self.0.page_count()
        }

        fn page_text(&self, page_index: usize) -> Result<String> {
            self.0.page_text(page_index)
        }

        fn page_tables(&self, _page_index: usize) -> Result<Vec<Vec<Vec<String>>>> {
            bail!("grid extraction failed")
        }

        fn render_page(&self, page_index: usize, dpi: u32) -> Result<Vec<u8>> {
            self.0.render_page(page_index, dpi)
        }
    }

    fn artifact_paths(dir: &Path) -> ArtifactPaths {
        ArtifactPaths {
            toc_path: dir.join("toc.jsonl"),
            sections_path: dir.join("sections.jsonl"),
            metadata_path: dir.join("metadata.json"),
        }
    }

    fn sample_pages() -> StaticPages {
        StaticPages::from_texts(&[
            "Table of Contents\n2.1 Power Rules ......... 10",
            "List of Tables",
            "2.1 Power Rules\nTable 4.1 Fixed Supply",
        ])
    }

    #[test]
    fn extract_and_persist_writes_all_stage_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf_path = dir.path().join("doc.pdf");
        std::fs::write(&pdf_path, b"%PDF-1.4 sample").expect("write pdf stub");
        let paths = artifact_paths(dir.path());

        let extraction =
            extract_and_persist(&sample_pages(), None, "USB PD Spec", &pdf_path, &paths)
                .expect("extraction should succeed");

        assert_eq!(extraction.toc_entries.len(), 1);
        assert_eq!(extraction.body_entries.len(), 1);
        assert_eq!(extraction.counts.tables_in_body, 1);
        assert_eq!(extraction.metadata.toc_start, 0);
        assert_eq!(extraction.metadata.toc_end, 0);
        assert_eq!(extraction.metadata.total_pages, 3);

        let toc: Vec<SectionEntry> = read_jsonl(&paths.toc_path).expect("read toc");
        let body: Vec<SectionEntry> = read_jsonl(&paths.sections_path).expect("read sections");
        assert_eq!(toc.len(), 1);
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].page, 3);
        assert!(paths.metadata_path.exists());
    }

    #[test]
    fn entry_artifacts_survive_a_failure_in_the_tally_stage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf_path = dir.path().join("doc.pdf");
        std::fs::write(&pdf_path, b"%PDF-1.4 sample").expect("write pdf stub");
        let paths = artifact_paths(dir.path());

        let source = GridFailPages(sample_pages());
        let result = extract_and_persist(&source, None, "USB PD Spec", &pdf_path, &paths);

        assert!(result.is_err());
        assert!(paths.toc_path.exists());
        assert!(paths.sections_path.exists());
        assert!(!paths.metadata_path.exists());
    }
}

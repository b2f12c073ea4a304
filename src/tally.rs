use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::model::{BodyCounts, PageRange};
use crate::pdf::{OCR_RENDER_DPI, OcrEngine, PageSource};

#[derive(Debug)]
pub struct TallyScanner {
    table_caption: Regex,
    figure_mention: Regex,
}

impl TallyScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table_caption: Regex::new(r"(?i)^Table\s+\d+\.\d+\s+.+")
                .context("failed to compile table caption regex")?,
            figure_mention: Regex::new(r"(?i)\bFigure\s+\d+[\.\-]?\d*")
                .context("failed to compile figure mention regex")?,
        })
    }

    pub fn count(
        &self,
        source: &dyn PageSource,
        toc_range: PageRange,
        ocr: Option<&dyn OcrEngine>,
    ) -> Result<BodyCounts> {
        let mut counts = BodyCounts::default();

        for page_index in 0..source.page_count() {
            if toc_range.contains(page_index) {
                continue;
            }

            let mut text = source.page_text(page_index)?;
            if text.trim().is_empty() {
                text = match ocr {
                    Some(ocr) => self.ocr_page(source, page_index, ocr),
                    None => {
                        warn!(
                            page = page_index + 1,
                            "page has no extractable text and OCR is unavailable"
                        );
                        String::new()
                    }
                };
            }

            for line in text.lines() {
                let normalized = line.split_whitespace().collect::<Vec<&str>>().join(" ");
                if self.table_caption.is_match(&normalized) {
                    counts.tables_in_body += 1;
                } else if self.figure_mention.is_match(&normalized) {
                    counts.figures_in_body += 1;
                }
            }

            for grid in source.page_tables(page_index)? {
                if grid.len() >= 3 {
                    counts.tables_in_body += 1;
                }
            }

            debug!(
                page = page_index + 1,
                tables = counts.tables_in_body,
                figures = counts.figures_in_body,
                "tallied page"
            );
        }

        Ok(counts)
    }

    fn ocr_page(&self, source: &dyn PageSource, page_index: usize, ocr: &dyn OcrEngine) -> String {
        let recognized = source
            .render_page(page_index, OCR_RENDER_DPI)
            .and_then(|image_png| ocr.recognize(&image_png));

        match recognized {
            Ok(text) => {
                debug!(page = page_index + 1, "recovered page text via OCR");
                text
            }
            Err(error) => {
                warn!(
                    page = page_index + 1,
                    error = %error,
                    "OCR fallback failed; treating page as empty"
                );
                String::new()
            }
        }
    }
}

use std::collections::HashSet;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::model::{PageRange, SectionEntry};
use crate::pdf::PageSource;

#[derive(Debug)]
pub struct SectionScanner {
    caption_noise: Regex,
    heading_line: Regex,
}

impl SectionScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            caption_noise: Regex::new(r"(?i)^(Table|Figure)\s+\d")
                .context("failed to compile caption noise regex")?,
            heading_line: Regex::new(r"^(\d+(?:\.\d+)*)\s+([A-Za-z].+)$")
                .context("failed to compile body heading regex")?,
        })
    }

    pub fn extract(
        &self,
        source: &dyn PageSource,
        toc_range: PageRange,
        toc_ids: &HashSet<String>,
        doc_title: &str,
    ) -> Result<Vec<SectionEntry>> {
        let mut entries = Vec::new();

        for page_index in 0..source.page_count() {
            if toc_range.contains(page_index) {
                continue;
            }

            let text = source.page_text(page_index)?;
            debug!(page = page_index + 1, "scanning body page for headings");

            for line in text.lines() {
                let trimmed = line.trim();
                if self.caption_noise.is_match(trimmed) {
                    continue;
                }

                let Some(captures) = self.heading_line.captures(trimmed) else {
                    continue;
                };
                let (Some(section_id), Some(raw_title)) = (captures.get(1), captures.get(2))
                else {
                    continue;
                };
                if !toc_ids.contains(section_id.as_str()) {
                    continue;
                }

                entries.push(SectionEntry::new(
                    doc_title,
                    section_id.as_str(),
                    raw_title.as_str(),
                    page_index as i64 + 1,
                ));
            }
        }

        Ok(entries)
    }
}

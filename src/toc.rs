use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::model::{PageRange, SectionEntry};
use crate::pdf::PageSource;

pub const TOC_FALLBACK_WINDOW: usize = 6;

#[derive(Debug, Error)]
#[error("no table of contents marker found across {page_count} pages")]
pub struct TocNotFound {
    pub page_count: usize,
}

#[derive(Debug)]
pub struct TocParser {
    start_marker: Regex,
    end_marker: Regex,
    entry_line: Regex,
}

impl TocParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            start_marker: Regex::new(r"(?i)Table of Contents")
                .context("failed to compile TOC start marker regex")?,
            end_marker: Regex::new(r"(?i)List of (Tables|Figures)")
                .context("failed to compile TOC end marker regex")?,
            entry_line: Regex::new(r"^\s*(\d+(?:\.\d+)*)\s+(.+?)\s+(?:\.{2,}\s*)?(\d+)$")
                .context("failed to compile TOC entry line regex")?,
        })
    }

    pub fn locate(&self, source: &dyn PageSource) -> Result<PageRange> {
        let total_pages = source.page_count();
        let mut start_page: Option<usize> = None;
        let mut end_page: Option<usize> = None;

        for page_index in 0..total_pages {
            let text = source.page_text(page_index)?;
            debug!(
                page = page_index + 1,
                total_pages, "scanning page for TOC markers"
            );

            if start_page.is_none() {
                if self.start_marker.is_match(&text) {
                    start_page = Some(page_index);
                }
                continue;
            }

            if self.end_marker.is_match(&text) {
                end_page = Some(page_index - 1);
                break;
            }
        }

        let Some(start_page) = start_page else {
            return Err(TocNotFound {
                page_count: total_pages,
            }
            .into());
        };

        let end_page = end_page
            .unwrap_or_else(|| (start_page + TOC_FALLBACK_WINDOW).min(total_pages.saturating_sub(1)));

        Ok(PageRange {
            start_page,
            end_page,
        })
    }

    pub fn extract(
        &self,
        source: &dyn PageSource,
        range: PageRange,
        doc_title: &str,
    ) -> Result<Vec<SectionEntry>> {
        let mut entries = Vec::new();

        for page_index in range.start_page..=range.end_page {
            let text = source.page_text(page_index)?;
            debug!(page = page_index + 1, "parsing TOC page");

            for line in text.lines() {
                let Some(captures) = self.entry_line.captures(line.trim()) else {
                    continue;
                };

                let (Some(section_id), Some(raw_title), Some(declared_page)) =
                    (captures.get(1), captures.get(2), captures.get(3))
                else {
                    continue;
                };
                let Ok(declared_page) = declared_page.as_str().parse::<i64>() else {
                    continue;
                };

                entries.push(SectionEntry::new(
                    doc_title,
                    section_id.as_str(),
                    raw_title.as_str(),
                    declared_page,
                ));
            }
        }

        Ok(entries)
    }
}

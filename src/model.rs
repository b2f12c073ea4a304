use serde::{Deserialize, Serialize};

use crate::util::{level_of, normalize_title, parent_of};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionEntry {
    pub doc_title: String,
    pub section_id: String,
    pub title: String,
    pub page: i64,
    pub level: u32,
    pub parent_id: Option<String>,
    pub full_path: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SectionEntry {
    pub fn new(doc_title: &str, section_id: &str, raw_title: &str, page: i64) -> Self {
        let title = normalize_title(raw_title);
        Self {
            doc_title: doc_title.to_string(),
            section_id: section_id.to_string(),
            title: title.clone(),
            page,
            level: level_of(section_id),
            parent_id: parent_of(section_id),
            full_path: format!("{section_id} {title}"),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start_page: usize,
    pub end_page: usize,
}

impl PageRange {
    pub fn contains(&self, page_index: usize) -> bool {
        page_index >= self.start_page && page_index <= self.end_page
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub section_id: String,
    pub title_toc: String,
    pub title_spec: Option<String>,
    pub page_toc: i64,
    pub page_spec: Option<i64>,
    pub found_in_spec: bool,
    pub match_title: bool,
    pub match_page: bool,
    pub match_overall: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileSummary {
    pub toc_total: usize,
    pub spec_total: usize,
    pub matched: usize,
    pub title_mismatch: usize,
    pub page_mismatch: usize,
    pub missing_in_spec: usize,
    pub missing_in_toc: usize,
}

#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub comparison: Vec<ComparisonRow>,
    pub mismatches: Vec<ComparisonRow>,
    pub missing_in_spec: Vec<ComparisonRow>,
    pub missing_in_toc: Vec<SectionEntry>,
    pub summary: ReconcileSummary,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BodyCounts {
    pub tables_in_body: usize,
    pub figures_in_body: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub doc_title: String,
    pub pdf_path: String,
    pub total_pages: usize,
    pub toc_start: usize,
    pub toc_end: usize,
    pub tables_in_body: usize,
    pub figures_in_body: usize,
    pub source_sha256: String,
    pub generated_at: String,
}

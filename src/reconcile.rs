use std::collections::{HashMap, HashSet};

use crate::model::{ComparisonRow, ReconcileReport, ReconcileSummary, SectionEntry};

const PAGE_TOLERANCE: i64 = 1;

pub fn build_report(
    toc_entries: &[SectionEntry],
    body_entries: &[SectionEntry],
) -> ReconcileReport {
    let mut body_index: HashMap<&str, &SectionEntry> = HashMap::new();
    for entry in body_entries {
        body_index.entry(entry.section_id.as_str()).or_insert(entry);
    }

    let toc_ids: HashSet<&str> = toc_entries
        .iter()
        .map(|entry| entry.section_id.as_str())
        .collect();

    let comparison: Vec<ComparisonRow> = toc_entries
        .iter()
        .map(|toc_entry| {
            let body_entry = body_index.get(toc_entry.section_id.as_str()).copied();
            compare_entry(toc_entry, body_entry)
        })
        .collect();

    let mismatches: Vec<ComparisonRow> = comparison
        .iter()
        .filter(|row| row.found_in_spec && !row.match_overall)
        .cloned()
        .collect();
    let missing_in_spec: Vec<ComparisonRow> = comparison
        .iter()
        .filter(|row| !row.found_in_spec)
        .cloned()
        .collect();
    let missing_in_toc: Vec<SectionEntry> = body_entries
        .iter()
        .filter(|entry| !toc_ids.contains(entry.section_id.as_str()))
        .cloned()
        .collect();

    let summary = ReconcileSummary {
        toc_total: toc_entries.len(),
        spec_total: body_entries.len(),
        matched: comparison.iter().filter(|row| row.match_overall).count(),
        title_mismatch: comparison
            .iter()
            .filter(|row| row.found_in_spec && !row.match_title)
            .count(),
        page_mismatch: comparison
            .iter()
            .filter(|row| row.found_in_spec && !row.match_page)
            .count(),
        missing_in_spec: missing_in_spec.len(),
        missing_in_toc: missing_in_toc.len(),
    };

    ReconcileReport {
        comparison,
        mismatches,
        missing_in_spec,
        missing_in_toc,
        summary,
    }
}

fn compare_entry(toc_entry: &SectionEntry, body_entry: Option<&SectionEntry>) -> ComparisonRow {
    let Some(body_entry) = body_entry else {
        return ComparisonRow {
            section_id: toc_entry.section_id.clone(),
            title_toc: toc_entry.title.clone(),
            title_spec: None,
            page_toc: toc_entry.page,
            page_spec: None,
            found_in_spec: false,
            match_title: false,
            match_page: false,
            match_overall: false,
        };
    };

    let match_title = titles_match(&toc_entry.title, &body_entry.title);
    let match_page = (toc_entry.page - body_entry.page).abs() <= PAGE_TOLERANCE;

    ComparisonRow {
        section_id: toc_entry.section_id.clone(),
        title_toc: toc_entry.title.clone(),
        title_spec: Some(body_entry.title.clone()),
        page_toc: toc_entry.page,
        page_spec: Some(body_entry.page),
        found_in_spec: true,
        match_title,
        match_page,
        match_overall: match_title && match_page,
    }
}

fn titles_match(toc_title: &str, body_title: &str) -> bool {
    toc_title.trim().to_lowercase() == body_title.trim().to_lowercase()
}

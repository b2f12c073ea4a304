use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ReconcileArgs;
use crate::model::{BodyCounts, RunMetadata, SectionEntry};
use crate::reconcile::build_report;
use crate::report::write_workbook;
use crate::util::{read_json, read_jsonl};

pub fn run(args: ReconcileArgs) -> Result<()> {
    let toc_path = args
        .toc_path
        .clone()
        .unwrap_or_else(|| args.out_dir.join("toc.jsonl"));
    let sections_path = args
        .sections_path
        .clone()
        .unwrap_or_else(|| args.out_dir.join("sections.jsonl"));
    let metadata_path = args
        .metadata_path
        .clone()
        .unwrap_or_else(|| args.out_dir.join("metadata.json"));
    let report_path = args
        .report_path
        .clone()
        .unwrap_or_else(|| args.out_dir.join("report.sqlite"));

    let toc_entries: Vec<SectionEntry> = read_jsonl(&toc_path)
        .with_context(|| format!("failed to load TOC entries: {}", toc_path.display()))?;
    let body_entries: Vec<SectionEntry> = read_jsonl(&sections_path)
        .with_context(|| format!("failed to load body entries: {}", sections_path.display()))?;
    let metadata: RunMetadata = read_json(&metadata_path)
        .with_context(|| format!("failed to load run metadata: {}", metadata_path.display()))?;

    info!(
        toc_entries = toc_entries.len(),
        body_entries = body_entries.len(),
        doc_title = %metadata.doc_title,
        "loaded extraction artifacts"
    );

    let report = build_report(&toc_entries, &body_entries);
    let counts = BodyCounts {
        tables_in_body: metadata.tables_in_body,
        figures_in_body: metadata.figures_in_body,
    };

    write_workbook(&report_path, &toc_entries, &body_entries, &report, counts)?;

    info!(
        path = %report_path.display(),
        matched = report.summary.matched,
        mismatches = report.mismatches.len(),
        missing_in_spec = report.summary.missing_in_spec,
        missing_in_toc = report.summary.missing_in_toc,
        "wrote reconciliation workbook"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionEntry;
    use crate::util::{write_json_pretty, write_jsonl};
    use rusqlite::Connection;

    fn entry(section_id: &str, title: &str, page: i64) -> SectionEntry {
        SectionEntry::new("USB PD Spec", section_id, title, page)
    }

    #[test]
    fn reconcile_reads_artifacts_and_writes_the_workbook() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out_dir = dir.path().to_path_buf();

        let toc = vec![entry("2.1", "Power Rules", 10), entry("3.0", "Orphan", 5)];
        let body = vec![entry("2.1", "power rules", 11)];
        write_jsonl(&out_dir.join("toc.jsonl"), &toc).expect("write toc");
        write_jsonl(&out_dir.join("sections.jsonl"), &body).expect("write sections");

        let metadata = RunMetadata {
            doc_title: "USB PD Spec".to_string(),
            pdf_path: "spec.pdf".to_string(),
            total_pages: 200,
            toc_start: 2,
            toc_end: 8,
            tables_in_body: 12,
            figures_in_body: 30,
            source_sha256: "deadbeef".to_string(),
            generated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        write_json_pretty(&out_dir.join("metadata.json"), &metadata).expect("write metadata");

        run(ReconcileArgs {
            out_dir: out_dir.clone(),
            toc_path: None,
            sections_path: None,
            metadata_path: None,
            report_path: None,
        })
        .expect("reconcile should succeed");

        let conn = Connection::open(out_dir.join("report.sqlite")).expect("open workbook");
        let comparison: i64 = conn
            .query_row("SELECT COUNT(*) FROM comparison", [], |row| row.get(0))
            .expect("comparison count");
        let missing: i64 = conn
            .query_row("SELECT COUNT(*) FROM missing_in_spec", [], |row| row.get(0))
            .expect("missing count");
        let tables: i64 = conn
            .query_row("SELECT tables_in_body FROM counts", [], |row| row.get(0))
            .expect("counts row");

        assert_eq!(comparison, 2);
        assert_eq!(missing, 1);
        assert_eq!(tables, 12);
    }
}

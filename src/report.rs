use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, params};

use crate::model::{BodyCounts, ComparisonRow, ReconcileReport, ReconcileSummary, SectionEntry};
use crate::util::ensure_directory;

pub fn write_workbook(
    path: &Path,
    toc_entries: &[SectionEntry],
    body_entries: &[SectionEntry],
    report: &ReconcileReport,
    counts: BodyCounts,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut connection = Connection::open(path)
        .with_context(|| format!("failed to open workbook: {}", path.display()))?;

    let tx = connection
        .transaction()
        .context("failed to begin workbook transaction")?;

    refresh_schema(&tx)?;

    insert_comparison_rows(&tx, "comparison", &report.comparison)?;
    insert_comparison_rows(&tx, "mismatches", &report.mismatches)?;
    insert_comparison_rows(&tx, "missing_in_spec", &report.missing_in_spec)?;
    insert_entries(&tx, "missing_in_toc", &report.missing_in_toc)?;
    insert_entries(&tx, "toc_df", toc_entries)?;
    insert_entries(&tx, "spec_df", body_entries)?;
    insert_summary(&tx, &report.summary)?;
    insert_counts(&tx, counts)?;

    tx.commit()
        .with_context(|| format!("failed to commit workbook: {}", path.display()))?;

    Ok(())
}

pub const SHEET_NAMES: [&str; 8] = [
    "comparison",
    "mismatches",
    "missing_in_spec",
    "missing_in_toc",
    "toc_df",
    "spec_df",
    "summary",
    "counts",
];

const COMPARISON_TABLES: [&str; 3] = ["comparison", "mismatches", "missing_in_spec"];
const ENTRY_TABLES: [&str; 3] = ["missing_in_toc", "toc_df", "spec_df"];

fn refresh_schema(tx: &Transaction<'_>) -> Result<()> {
    for table_name in SHEET_NAMES {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table_name};"))
            .with_context(|| format!("failed to drop sheet table {table_name}"))?;
    }

    for table_name in COMPARISON_TABLES {
        tx.execute_batch(&format!(
            "
            CREATE TABLE {table_name} (
              section_id TEXT NOT NULL,
              title_toc TEXT NOT NULL,
              title_spec TEXT,
              page_toc INTEGER NOT NULL,
              page_spec INTEGER,
              found_in_spec INTEGER NOT NULL,
              match_title INTEGER NOT NULL,
              match_page INTEGER NOT NULL,
              match_overall INTEGER NOT NULL
            );
            "
        ))
        .with_context(|| format!("failed to create sheet table {table_name}"))?;
    }

    for table_name in ENTRY_TABLES {
        tx.execute_batch(&format!(
            "
            CREATE TABLE {table_name} (
              doc_title TEXT NOT NULL,
              section_id TEXT NOT NULL,
              title TEXT NOT NULL,
              page INTEGER NOT NULL,
              level INTEGER NOT NULL,
              parent_id TEXT,
              full_path TEXT NOT NULL,
              tags TEXT NOT NULL
            );
            "
        ))
        .with_context(|| format!("failed to create sheet table {table_name}"))?;
    }

    tx.execute_batch(
        "
        CREATE TABLE summary (
          toc_total INTEGER NOT NULL,
          spec_total INTEGER NOT NULL,
          matched INTEGER NOT NULL,
          title_mismatch INTEGER NOT NULL,
          page_mismatch INTEGER NOT NULL,
          missing_in_spec INTEGER NOT NULL,
          missing_in_toc INTEGER NOT NULL
        );

        CREATE TABLE counts (
          tables_in_body INTEGER NOT NULL,
          figures_in_body INTEGER NOT NULL
        );
        ",
    )
    .context("failed to create summary and counts tables")?;

    Ok(())
}

fn insert_comparison_rows(
    tx: &Transaction<'_>,
    table_name: &str,
    rows: &[ComparisonRow],
) -> Result<()> {
    let mut statement = tx
        .prepare(&format!(
            "
            INSERT INTO {table_name}(
              section_id, title_toc, title_spec, page_toc, page_spec,
              found_in_spec, match_title, match_page, match_overall
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "
        ))
        .with_context(|| format!("failed to prepare insert for {table_name}"))?;

    for row in rows {
        statement
            .execute(params![
                row.section_id,
                row.title_toc,
                row.title_spec,
                row.page_toc,
                row.page_spec,
                row.found_in_spec,
                row.match_title,
                row.match_page,
                row.match_overall
            ])
            .with_context(|| format!("failed to insert row into {table_name}"))?;
    }

    Ok(())
}

fn insert_entries(
    tx: &Transaction<'_>,
    table_name: &str,
    entries: &[SectionEntry],
) -> Result<()> {
    let mut statement = tx
        .prepare(&format!(
            "
            INSERT INTO {table_name}(
              doc_title, section_id, title, page, level, parent_id, full_path, tags
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "
        ))
        .with_context(|| format!("failed to prepare insert for {table_name}"))?;

    for entry in entries {
        let tags = serde_json::to_string(&entry.tags)
            .with_context(|| format!("failed to serialize tags for {}", entry.section_id))?;

        statement
            .execute(params![
                entry.doc_title,
                entry.section_id,
                entry.title,
                entry.page,
                entry.level,
                entry.parent_id,
                entry.full_path,
                tags
            ])
            .with_context(|| format!("failed to insert entry into {table_name}"))?;
    }

    Ok(())
}

fn insert_summary(tx: &Transaction<'_>, summary: &ReconcileSummary) -> Result<()> {
    tx.execute(
        "
        INSERT INTO summary(
          toc_total, spec_total, matched, title_mismatch, page_mismatch,
          missing_in_spec, missing_in_toc
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            summary.toc_total,
            summary.spec_total,
            summary.matched,
            summary.title_mismatch,
            summary.page_mismatch,
            summary.missing_in_spec,
            summary.missing_in_toc
        ],
    )
    .context("failed to insert summary row")?;

    Ok(())
}

fn insert_counts(tx: &Transaction<'_>, counts: BodyCounts) -> Result<()> {
    tx.execute(
        "INSERT INTO counts(tables_in_body, figures_in_body) VALUES(?1, ?2)",
        params![counts.tables_in_body, counts.figures_in_body],
    )
    .context("failed to insert counts row")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionEntry;
    use crate::reconcile::build_report;

    fn entry(section_id: &str, title: &str, page: i64) -> SectionEntry {
        SectionEntry::new("USB PD Spec", section_id, title, page)
    }

    fn table_count(conn: &Connection, table_name: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table_name}"), [], |row| {
            row.get(0)
        })
        .expect("count query")
    }

    #[test]
    fn workbook_contains_all_eight_sheets_with_expected_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.sqlite");

        let toc = vec![
            entry("1", "Introduction", 1),
            entry("2", "Overview", 5),
            entry("3", "Protocol", 9),
        ];
        let body = vec![
            entry("1", "Introduction", 1),
            entry("2", "Overview", 8),
            entry("9.9", "Ghost Section", 50),
        ];
        let report = build_report(&toc, &body);
        let counts = BodyCounts {
            tables_in_body: 4,
            figures_in_body: 7,
        };

        write_workbook(&path, &toc, &body, &report, counts).expect("workbook write");

        let conn = Connection::open(&path).expect("open workbook");
        assert_eq!(table_count(&conn, "comparison"), 3);
        assert_eq!(table_count(&conn, "mismatches"), 1);
        assert_eq!(table_count(&conn, "missing_in_spec"), 1);
        assert_eq!(table_count(&conn, "missing_in_toc"), 1);
        assert_eq!(table_count(&conn, "toc_df"), 3);
        assert_eq!(table_count(&conn, "spec_df"), 3);
        assert_eq!(table_count(&conn, "summary"), 1);
        assert_eq!(table_count(&conn, "counts"), 1);
    }

    #[test]
    fn comparison_rows_preserve_match_flags_and_nullable_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.sqlite");

        let toc = vec![entry("3.0", "Orphan Section", 5)];
        let report = build_report(&toc, &[]);

        write_workbook(&path, &toc, &[], &report, BodyCounts::default()).expect("workbook write");

        let conn = Connection::open(&path).expect("open workbook");
        let (title_spec, page_spec, found): (Option<String>, Option<i64>, bool) = conn
            .query_row(
                "SELECT title_spec, page_spec, found_in_spec FROM comparison",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .expect("comparison row");

        assert!(title_spec.is_none());
        assert!(page_spec.is_none());
        assert!(!found);
    }

    #[test]
    fn rewriting_the_workbook_replaces_previous_sheets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.sqlite");

        let first_toc = vec![entry("1", "Introduction", 1), entry("2", "Overview", 5)];
        let first_report = build_report(&first_toc, &first_toc);
        write_workbook(&path, &first_toc, &first_toc, &first_report, BodyCounts::default())
            .expect("first write");

        let second_toc = vec![entry("1", "Introduction", 1)];
        let second_report = build_report(&second_toc, &second_toc);
        write_workbook(&path, &second_toc, &second_toc, &second_report, BodyCounts::default())
            .expect("second write");

        let conn = Connection::open(&path).expect("open workbook");
        assert_eq!(table_count(&conn, "comparison"), 1);
        assert_eq!(table_count(&conn, "toc_df"), 1);
    }

    #[test]
    fn entry_sheets_store_tags_as_json_arrays() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.sqlite");

        let toc = vec![entry("2.1", "Power Rules", 10)];
        let report = build_report(&toc, &toc);
        write_workbook(&path, &toc, &toc, &report, BodyCounts::default()).expect("workbook write");

        let conn = Connection::open(&path).expect("open workbook");
        let tags: String = conn
            .query_row("SELECT tags FROM toc_df", [], |row| row.get(0))
            .expect("tags column");
        assert_eq!(tags, "[]");
    }
}

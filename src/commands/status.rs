use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::RunMetadata;
use crate::report::SHEET_NAMES;
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let metadata_path = args
        .metadata_path
        .clone()
        .unwrap_or_else(|| args.out_dir.join("metadata.json"));
    let report_path = args
        .report_path
        .clone()
        .unwrap_or_else(|| args.out_dir.join("report.sqlite"));

    info!(out_dir = %args.out_dir.display(), "status requested");

    if metadata_path.exists() {
        let metadata: RunMetadata = read_json(&metadata_path)?;
        info!(
            doc_title = %metadata.doc_title,
            pdf_path = %metadata.pdf_path,
            total_pages = metadata.total_pages,
            toc_start = metadata.toc_start,
            toc_end = metadata.toc_end,
            tables_in_body = metadata.tables_in_body,
            figures_in_body = metadata.figures_in_body,
            source_sha256 = %metadata.source_sha256,
            generated_at = %metadata.generated_at,
            "loaded run metadata"
        );
    } else {
        warn!(path = %metadata_path.display(), "run metadata missing");
    }

    if report_path.exists() {
        let conn = Connection::open(&report_path)
            .with_context(|| format!("failed to open {}", report_path.display()))?;

        for sheet_name in SHEET_NAMES {
            let rows =
                query_count(&conn, &format!("SELECT COUNT(*) FROM {sheet_name}")).unwrap_or(0);
            info!(sheet = sheet_name, rows, "workbook sheet");
        }
    } else {
        warn!(path = %report_path.display(), "workbook missing");
    }

    Ok(())
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

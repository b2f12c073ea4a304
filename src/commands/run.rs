use anyhow::Result;
use tracing::info;

use crate::cli::{ExtractArgs, RunArgs};
use crate::commands::extract;
use crate::reconcile::build_report;
use crate::report::write_workbook;

pub fn run(args: RunArgs) -> Result<()> {
    let extract_args = ExtractArgs {
        pdf_path: args.pdf_path.clone(),
        doc_title: args.doc_title.clone(),
        out_dir: args.out_dir.clone(),
        toc_path: args.toc_path.clone(),
        sections_path: args.sections_path.clone(),
        metadata_path: args.metadata_path.clone(),
        max_pages: args.max_pages,
        ocr_lang: args.ocr_lang.clone(),
    };
    let report_path = args
        .report_path
        .clone()
        .unwrap_or_else(|| args.out_dir.join("report.sqlite"));

    let extraction = extract::extract_document(&extract_args)?;

    let report = build_report(&extraction.toc_entries, &extraction.body_entries);
    write_workbook(
        &report_path,
        &extraction.toc_entries,
        &extraction.body_entries,
        &report,
        extraction.counts,
    )?;

    info!(
        path = %report_path.display(),
        toc_total = report.summary.toc_total,
        spec_total = report.summary.spec_total,
        matched = report.summary.matched,
        missing_in_spec = report.summary.missing_in_spec,
        missing_in_toc = report.summary.missing_in_toc,
        "run complete"
    );

    Ok(())
}

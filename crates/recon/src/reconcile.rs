use std::collections::BTreeSet;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::compare::{compare_field, Outcome, ResolvedRule, SkipReason};
use crate::config::AuditConfig;
use crate::model::{
    AnnotationSink, CellMark, MarkKind, ReferenceCategory, SheetReport, SheetStatus, Workbook,
};
use crate::reference::{ReferenceSet, ReferenceTable};
use crate::resolve::{resolve_column, resolve_sheet};

/// Rows between progress log lines.
const PROGRESS_EVERY: usize = 10;

/// One reference table with its rules resolved against the current sheet.
struct Plan<'a> {
    reference: &'a ReferenceTable,
    rules: Vec<ResolvedRule<'a>>,
}

/// Reconcile one primary sheet against every reference table.
///
/// Mismatched cells are marked as they are found; identifier cells of rows
/// with at least one mismatch are flagged after the row loop. A sheet that
/// cannot be found, or that has no identifier column, yields a zero-count
/// report instead of an error.
pub fn reconcile_sheet(
    workbook: &Workbook,
    keyword: &str,
    refs: &ReferenceSet,
    config: &AuditConfig,
    sink: &mut dyn AnnotationSink,
) -> SheetReport {
    let start = Instant::now();

    let table = match resolve_sheet(workbook, keyword) {
        Ok(t) => t,
        Err(e) => {
            warn!(keyword, "{e}; sheet skipped");
            return SheetReport::skipped(keyword, None, SheetStatus::SheetNotFound, start.elapsed());
        }
    };

    let Some(id_col) = resolve_column(table, &config.primary.id_keyword, false) else {
        warn!(
            sheet = %table.name,
            keyword = %config.primary.id_keyword,
            "sheet has no identifier column; sheet skipped"
        );
        return SheetReport::skipped(
            keyword,
            Some(table.name.clone()),
            SheetStatus::IdentifierColumnMissing,
            start.elapsed(),
        );
    };

    // Resolve every rule once, in fixed category order
    let plans: Vec<Plan<'_>> = ReferenceCategory::ALL
        .iter()
        .filter_map(|&category| {
            let reference = refs.get(category)?;
            let rules = config
                .reference(category)
                .map(|rc| {
                    rc.fields
                        .iter()
                        .map(|rule| ResolvedRule::resolve(rule, table, reference, config))
                        .collect()
                })
                .unwrap_or_default();
            Some(Plan { reference, rules })
        })
        .collect();

    for plan in &plans {
        for r in plan.rules.iter().filter(|r| !r.is_resolved()) {
            debug!(
                sheet = %table.name,
                category = %plan.reference.category,
                primary = %r.rule.primary,
                reference = %r.rule.reference,
                "field column not found; comparisons skipped"
            );
        }
    }

    let mut seen = BTreeSet::new();
    let mut mismatches = 0usize;
    let mut skipped_blank_reference = 0usize;
    let mut rows_checked = 0usize;
    let mut flagged_rows = Vec::new();
    let total = table.rows.len();

    for (i, row) in table.rows.iter().enumerate() {
        if let Some(id) = row.get(id_col).identifier() {
            seen.insert(id.clone());
            rows_checked += 1;

            let mut row_has_mismatch = false;
            for plan in &plans {
                for rule in &plan.rules {
                    match compare_field(row, &id, plan.reference, rule, &config.compare) {
                        Outcome::Mismatch { row: cell_row, col } => {
                            mismatches += 1;
                            row_has_mismatch = true;
                            sink.mark(CellMark { row: cell_row, col, kind: MarkKind::Mismatch });
                        }
                        Outcome::Skipped(SkipReason::BlankReference) => {
                            skipped_blank_reference += 1;
                        }
                        Outcome::NoMismatch | Outcome::Skipped(_) => {}
                    }
                }
            }
            if row_has_mismatch {
                flagged_rows.push(row.physical_row);
            }
        }

        if (i + 1) % PROGRESS_EVERY == 0 || i + 1 == total {
            debug!(sheet = %table.name, row = i + 1, total, mismatches, "progress");
        }
    }

    for &row in &flagged_rows {
        sink.mark(CellMark { row, col: id_col, kind: MarkKind::RowFlag });
    }

    let elapsed = start.elapsed();
    info!(
        sheet = %table.name,
        rows = rows_checked,
        mismatches,
        skipped_blank_reference,
        elapsed_ms = elapsed.as_millis() as u64,
        "sheet reconciled"
    );

    SheetReport {
        keyword: keyword.to_string(),
        sheet_name: Some(table.name.clone()),
        status: SheetStatus::Checked,
        rows_checked,
        mismatches,
        skipped_blank_reference,
        elapsed,
        flagged_rows,
        identifier_column: Some(id_col),
        seen,
        marks: Vec::new(),
    }
}

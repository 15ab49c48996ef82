use tracing::{info, warn};

use crate::aggregate::RunTotals;
use crate::config::AuditConfig;
use crate::error::ReconError;
use crate::missing::detect_missing;
use crate::model::{AuditMeta, AuditResult, AuditSummary, CellMark, MissingReport, ReferenceCategory, Workbook};
use crate::reconcile::reconcile_sheet;
use crate::reference::ReferenceSet;

/// Everything a run needs, already loaded.
#[derive(Debug, Clone, Default)]
pub struct AuditInput {
    pub primary: Workbook,
    pub references: ReferenceSet,
}

/// Run the audit per config: every primary sheet in order, then the
/// missing-record check over the union of identifiers seen.
pub fn run(config: &AuditConfig, input: &AuditInput) -> Result<AuditResult, ReconError> {
    config.validate()?;

    let mut totals = RunTotals::default();
    let mut sheets = Vec::with_capacity(config.primary.sheets.len());

    for keyword in &config.primary.sheets {
        let mut marks: Vec<CellMark> = Vec::new();
        let mut report = reconcile_sheet(&input.primary, keyword, &input.references, config, &mut marks);
        report.marks = marks;
        totals.absorb(&report);
        sheets.push(report);
    }

    let missing = match input.references.get(ReferenceCategory::FieldMaster) {
        Some(field_master) => {
            let mut marks: Vec<CellMark> = Vec::new();
            let mut report = detect_missing(field_master, &totals.seen, &config.missing, &mut marks);
            report.marks = marks;
            report
        }
        None => {
            warn!("no field-master table loaded; missing-record check skipped");
            MissingReport {
                annotation_column: config.missing.annotation_column.clone(),
                ..MissingReport::default()
            }
        }
    };

    let summary = AuditSummary {
        sheets_checked: totals.sheets_checked,
        sheets_skipped: totals.sheets_skipped,
        mismatches: totals.mismatches,
        skipped_blank_reference: totals.skipped_blank_reference,
        identifiers_seen: totals.seen.len(),
        missing: missing.missing_count,
        elapsed_ms: totals.elapsed.as_millis(),
    };

    info!(
        sheets = summary.sheets_checked,
        mismatches = summary.mismatches,
        missing = summary.missing,
        "audit finished"
    );

    Ok(AuditResult {
        meta: AuditMeta {
            config_name: config.name.clone(),
            variant: config.variant,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        references: input.references.iter().map(|r| r.summary()).collect(),
        sheets,
        missing,
    })
}

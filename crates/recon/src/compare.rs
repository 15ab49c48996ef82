use serde::Serialize;

use crate::config::{AuditConfig, CompareConfig, FieldRule};
use crate::model::{RawValue, Table, TableRow};
use crate::normalize::{normalize, same_date, Normalized};
use crate::reference::ReferenceTable;
use crate::resolve::resolve_column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Primary, reference or reference-identifier column not found.
    ColumnNotFound,
    /// Primary row has no identifier.
    NoIdentifier,
    /// No reference row carries the identifier.
    NoReferenceRow,
    /// Reference left the field blank and the rule tolerates that.
    BlankReference,
    /// Both cells are empty.
    BothAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoMismatch,
    /// The primary cell at this physical position disagrees.
    Mismatch { row: u32, col: usize },
    Skipped(SkipReason),
}

/// A field rule with its columns resolved against one primary sheet and one
/// reference table. Resolution is per sheet, not per row.
#[derive(Debug, Clone)]
pub struct ResolvedRule<'a> {
    pub rule: &'a FieldRule,
    pub primary_col: Option<usize>,
    pub reference_col: Option<usize>,
    pub date_field: bool,
    pub tolerance: f64,
}

impl<'a> ResolvedRule<'a> {
    pub fn resolve(
        rule: &'a FieldRule,
        primary: &Table,
        reference: &ReferenceTable,
        config: &AuditConfig,
    ) -> Self {
        Self {
            rule,
            primary_col: resolve_column(primary, &rule.primary, rule.exact),
            reference_col: resolve_column(&reference.table, &rule.reference, rule.exact),
            date_field: config.is_date_field(rule),
            tolerance: config.tolerance_for(rule),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.primary_col.is_some() && self.reference_col.is_some()
    }
}

/// Compare one field of a primary row against the reference row sharing its
/// identifier.
pub fn compare_field(
    row: &TableRow,
    primary_id: &str,
    reference: &ReferenceTable,
    resolved: &ResolvedRule<'_>,
    compare: &CompareConfig,
) -> Outcome {
    let (Some(primary_col), Some(reference_col), Some(_)) =
        (resolved.primary_col, resolved.reference_col, reference.id_col)
    else {
        return Outcome::Skipped(SkipReason::ColumnNotFound);
    };

    if primary_id.is_empty() {
        return Outcome::Skipped(SkipReason::NoIdentifier);
    }
    let Some(ref_row) = reference.lookup(primary_id) else {
        return Outcome::Skipped(SkipReason::NoReferenceRow);
    };

    let ref_val = ref_row.get(reference_col);
    let main_val = row.get(primary_col);

    if resolved.rule.skip_blank_reference && is_blank_placeholder(ref_val, &compare.blank_markers) {
        return Outcome::Skipped(SkipReason::BlankReference);
    }

    if main_val.is_missing() && ref_val.is_missing() {
        return Outcome::Skipped(SkipReason::BothAbsent);
    }

    let agrees = if resolved.date_field {
        same_date(main_val, ref_val)
    } else {
        values_match(&normalize(main_val), &normalize(ref_val), resolved.tolerance)
    };

    if agrees {
        Outcome::NoMismatch
    } else {
        Outcome::Mismatch { row: row.physical_row, col: primary_col }
    }
}

/// Equality under the normalized-variant rules.
pub fn values_match(a: &Normalized, b: &Normalized, tolerance: f64) -> bool {
    match (a, b) {
        (Normalized::Number(x), Normalized::Number(y)) => (x - y).abs() <= tolerance,
        (Normalized::Absent, Normalized::Absent) => true,
        (Normalized::Absent, _) | (_, Normalized::Absent) => false,
        _ => a.canonical_text() == b.canonical_text(),
    }
}

fn is_blank_placeholder(value: &RawValue, markers: &[String]) -> bool {
    if value.is_missing() {
        return true;
    }
    let text = value.display_text().trim().to_lowercase();
    markers.iter().any(|m| m.trim().to_lowercase() == text)
}

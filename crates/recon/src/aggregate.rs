use std::collections::BTreeSet;
use std::time::Duration;

use crate::model::{SheetReport, SheetStatus};

/// Cross-sheet accumulator. Each sheet returns its own report; the caller
/// folds them in here, in sheet order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub sheets_checked: usize,
    pub sheets_skipped: usize,
    pub mismatches: usize,
    pub skipped_blank_reference: usize,
    pub elapsed: Duration,
    pub seen: BTreeSet<String>,
}

impl RunTotals {
    pub fn absorb(&mut self, report: &SheetReport) {
        match report.status {
            SheetStatus::Checked => self.sheets_checked += 1,
            SheetStatus::SheetNotFound | SheetStatus::IdentifierColumnMissing => {
                self.sheets_skipped += 1
            }
        }
        self.mismatches += report.mismatches;
        self.skipped_blank_reference += report.skipped_blank_reference;
        self.elapsed += report.elapsed;
        self.seen.extend(report.seen.iter().cloned());
    }
}

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::Variant;

// ---------------------------------------------------------------------------
// Raw cells + tables
// ---------------------------------------------------------------------------

/// A cell as the loader found it, before any normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

static EMPTY: RawValue = RawValue::Empty;

impl RawValue {
    /// True for cells that carry no value at all (blank, NaN, whitespace-only text).
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(n) => n.is_nan(),
            Self::Text(s) => s.trim().is_empty(),
            Self::Bool(_) | Self::DateTime(_) => false,
        }
    }

    /// The cell as it reads on screen: integral numbers without a fraction.
    pub fn display_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Trimmed identifier text, or `None` when the cell is blank.
    pub fn identifier(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        let text = self.display_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Format a number the way a spreadsheet shows it: `100.0` → `"100"`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// One data row. `physical_row` is the 0-based row in the source sheet, so
/// marks can address the same cell in an exported copy.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub physical_row: u32,
    pub cells: Vec<RawValue>,
}

impl TableRow {
    pub fn get(&self, col: usize) -> &RawValue {
        self.cells.get(col).unwrap_or(&EMPTY)
    }
}

/// A loaded worksheet: header names plus data rows below the header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    /// 0-based physical row of the header.
    pub header_row: u32,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, header_row: u32) -> Self {
        Self {
            name: name.into(),
            headers,
            header_row,
            rows: Vec::new(),
        }
    }

    /// Build a table whose data rows sit directly below the header.
    pub fn with_rows(
        name: impl Into<String>,
        headers: &[&str],
        header_row: u32,
        rows: Vec<Vec<RawValue>>,
    ) -> Self {
        let mut table = Self::new(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            header_row,
        );
        for (i, cells) in rows.into_iter().enumerate() {
            table.rows.push(TableRow {
                physical_row: header_row + 1 + i as u32,
                cells,
            });
        }
        table
    }

    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.cells.len())
            .max()
            .unwrap_or(0)
            .max(self.headers.len())
    }
}

/// The primary record workbook: one table per sheet, in workbook order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Table>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Reference categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceCategory {
    FundingDetail,
    FieldMaster,
    SecondaryDetail,
    HeavyTruck,
}

impl ReferenceCategory {
    /// Fixed processing order for every primary row.
    pub const ALL: [ReferenceCategory; 4] = [
        Self::FundingDetail,
        Self::FieldMaster,
        Self::SecondaryDetail,
        Self::HeavyTruck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FundingDetail => "funding_detail",
            Self::FieldMaster => "field_master",
            Self::SecondaryDetail => "secondary_detail",
            Self::HeavyTruck => "heavy_truck",
        }
    }
}

impl std::fmt::Display for ReferenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    /// This specific field disagrees with its reference.
    Mismatch,
    /// Identifier cell of a row with at least one mismatch.
    RowFlag,
    /// Identifier cell of a field-master row never seen in the primary sheets.
    Missing,
}

/// Mark instruction for one physical cell (0-based row and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellMark {
    pub row: u32,
    pub col: usize,
    pub kind: MarkKind,
}

/// Receives mark instructions. Renderers live outside the engine.
pub trait AnnotationSink {
    fn mark(&mut self, mark: CellMark);
}

impl AnnotationSink for Vec<CellMark> {
    fn mark(&mut self, mark: CellMark) {
        self.push(mark);
    }
}

// ---------------------------------------------------------------------------
// Per-sheet result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetStatus {
    Checked,
    SheetNotFound,
    IdentifierColumnMissing,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    pub keyword: String,
    pub sheet_name: Option<String>,
    pub status: SheetStatus,
    pub rows_checked: usize,
    pub mismatches: usize,
    pub skipped_blank_reference: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Physical rows whose identifier cell got a row flag.
    pub flagged_rows: Vec<u32>,
    pub identifier_column: Option<usize>,
    #[serde(skip)]
    pub seen: BTreeSet<String>,
    #[serde(skip)]
    pub marks: Vec<CellMark>,
}

impl SheetReport {
    /// Zero-count report for a sheet that could not be processed.
    pub fn skipped(
        keyword: &str,
        sheet_name: Option<String>,
        status: SheetStatus,
        elapsed: Duration,
    ) -> Self {
        Self {
            keyword: keyword.to_string(),
            sheet_name,
            status,
            rows_checked: 0,
            mismatches: 0,
            skipped_blank_reference: 0,
            elapsed,
            flagged_rows: Vec::new(),
            identifier_column: None,
            seen: BTreeSet::new(),
            marks: Vec::new(),
        }
    }
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

// ---------------------------------------------------------------------------
// Missing-record result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct MissingReport {
    pub annotation_column: String,
    pub missing_count: usize,
    pub missing_ids: Vec<String>,
    /// Resolved third-party flag column, if the table has one.
    pub third_party_column: Option<String>,
    /// Resolved bonus-type column, if the table has one.
    pub bonus_type_column: Option<String>,
    /// One entry per field-master data row.
    #[serde(skip)]
    pub annotations: Vec<Option<String>>,
    /// Indices into the field-master rows.
    #[serde(skip)]
    pub missing_rows: Vec<usize>,
    #[serde(skip)]
    pub marks: Vec<CellMark>,
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceSummary {
    pub category: ReferenceCategory,
    pub table: String,
    pub rows: usize,
    pub identifier_column: Option<String>,
    pub duplicate_reference_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub sheets_checked: usize,
    pub sheets_skipped: usize,
    pub mismatches: usize,
    pub skipped_blank_reference: usize,
    pub identifiers_seen: usize,
    pub missing: usize,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditMeta {
    pub config_name: String,
    pub variant: Variant,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub meta: AuditMeta,
    pub summary: AuditSummary,
    pub references: Vec<ReferenceSummary>,
    pub sheets: Vec<SheetReport>,
    pub missing: MissingReport,
}

impl AuditResult {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// True when the run found anything a reviewer has to look at.
    pub fn has_findings(&self) -> bool {
        self.summary.mismatches > 0 || self.summary.missing > 0
    }
}

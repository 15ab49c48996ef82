// Excel file import (xlsx, xlsm, xls, xlsb, ods) and annotated export (xlsx only)
//
// Import: every sheet is read into a physical grid; tables are views over it.
// Export: the source grid is written back cell by cell with mark fills.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};
use tracing::debug;

use contract_audit_recon::model::{AnnotationSink, CellMark, MarkKind, RawValue};
use contract_audit_recon::resolve::resolve_sheet_index;

use crate::error::IoError;
use crate::grid::Grid;

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<Sheets<std::io::BufReader<std::fs::File>>, IoError> {
    open_workbook_auto(path).map_err(|e| IoError::open(path, e))
}

/// Read every sheet, in workbook order.
pub fn import_all(path: &Path) -> Result<Vec<Grid>, IoError> {
    let mut workbook = open(path)?;
    let names: Vec<String> = workbook.sheet_names().to_vec();
    let mut grids = Vec::with_capacity(names.len());
    for name in &names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| IoError::read(path, format!("sheet '{name}': {e}")))?;
        grids.push(range_to_grid(name, &range));
    }
    debug!(path = %path.display(), sheets = grids.len(), "workbook read");
    Ok(grids)
}

/// Read the first sheet whose name contains `keyword`, or the first sheet.
pub fn import_sheet(path: &Path, keyword: Option<&str>) -> Result<Grid, IoError> {
    let mut workbook = open(path)?;
    let names: Vec<String> = workbook.sheet_names().to_vec();

    let idx = match keyword {
        Some(kw) => resolve_sheet_index(&names, kw).map_err(|_| IoError::SheetNotFound {
            path: path.to_path_buf(),
            keyword: kw.to_string(),
        })?,
        None if names.is_empty() => {
            return Err(IoError::read(path, "workbook contains no sheets"));
        }
        None => 0,
    };

    let name = &names[idx];
    let range = workbook
        .worksheet_range(name)
        .map_err(|e| IoError::read(path, format!("sheet '{name}': {e}")))?;
    Ok(range_to_grid(name, &range))
}

fn range_to_grid(name: &str, range: &Range<Data>) -> Grid {
    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<RawValue>> = vec![Vec::new(); start_row as usize];

    for row in range.rows() {
        let mut cells = vec![RawValue::Empty; start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        while matches!(cells.last(), Some(RawValue::Empty)) {
            cells.pop();
        }
        rows.push(cells);
    }

    Grid::new(name, rows)
}

fn convert_cell(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Empty,
        Data::String(s) if s.is_empty() => RawValue::Empty,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Float(n) => RawValue::Number(*n),
        Data::Int(n) => RawValue::Number(*n as f64),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::Error(e) => RawValue::Text(e.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if !dt.is_duration() => RawValue::DateTime(ndt),
            _ => RawValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s).map_or_else(|| RawValue::Text(s.clone()), RawValue::DateTime),
        Data::DurationIso(s) => RawValue::Text(s.clone()),
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

const MISMATCH_FILL: u32 = 0xFFC7CE;
const HIGHLIGHT_FILL: u32 = 0xFFFF00;
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Excel limits.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Collects mark instructions for one sheet and renders them as fills.
///
/// Marks are keyed by physical cell. A highlight (row flag or missing) on a
/// cell that is also a mismatch wins.
#[derive(Debug, Clone, Default)]
pub struct SheetAnnotator {
    marks: BTreeMap<(u32, usize), MarkKind>,
}

impl AnnotationSink for SheetAnnotator {
    fn mark(&mut self, mark: CellMark) {
        let slot = self.marks.entry((mark.row, mark.col)).or_insert(mark.kind);
        if precedence(mark.kind) > precedence(*slot) {
            *slot = mark.kind;
        }
    }
}

fn precedence(kind: MarkKind) -> u8 {
    match kind {
        MarkKind::Mismatch => 0,
        MarkKind::RowFlag | MarkKind::Missing => 1,
    }
}

impl SheetAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_marks(marks: &[CellMark]) -> Self {
        let mut annotator = Self::new();
        for &m in marks {
            annotator.mark(m);
        }
        annotator
    }

    pub fn kind_at(&self, row: u32, col: usize) -> Option<MarkKind> {
        self.marks.get(&(row, col)).copied()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Render `grid` into an in-memory xlsx with one sheet named `sheet_name`.
    pub fn render(&self, grid: &Grid, sheet_name: &str) -> Result<Vec<u8>, XlsxError> {
        let formats = Formats::new();
        let mut workbook = XlsxWorkbook::new();
        let worksheet = workbook.add_worksheet().set_name(sheet_title(sheet_name))?;

        for (r, cells) in grid.rows.iter().enumerate().take(MAX_ROWS) {
            for (c, value) in cells.iter().enumerate().take(MAX_COLS) {
                let fill = self.kind_at(r as u32, c);
                write_cell(worksheet, r as u32, c as u16, value, fill, &formats)?;
            }
        }

        // Marks past the written extent still get their fill
        for (&(row, col), &kind) in &self.marks {
            if grid.cell(row as usize, col) == &RawValue::Empty && (row as usize) < MAX_ROWS && col < MAX_COLS {
                worksheet.write_blank(row, col as u16, formats.plain(Some(kind)))?;
            }
        }

        workbook.save_to_buffer()
    }
}

struct Formats {
    plain: [Format; 3],
    datetime: [Format; 3],
}

impl Formats {
    fn new() -> Self {
        let fill = |f: Format, rgb: Option<u32>| match rgb {
            Some(rgb) => f.set_background_color(Color::RGB(rgb)),
            None => f,
        };
        let fills = [None, Some(MISMATCH_FILL), Some(HIGHLIGHT_FILL)];
        Self {
            plain: fills.map(|rgb| fill(Format::new(), rgb)),
            datetime: fills.map(|rgb| fill(Format::new().set_num_format(DATETIME_FORMAT), rgb)),
        }
    }

    fn slot(kind: Option<MarkKind>) -> usize {
        match kind {
            None => 0,
            Some(MarkKind::Mismatch) => 1,
            Some(MarkKind::RowFlag | MarkKind::Missing) => 2,
        }
    }

    fn plain(&self, kind: Option<MarkKind>) -> &Format {
        &self.plain[Self::slot(kind)]
    }

    fn datetime(&self, kind: Option<MarkKind>) -> &Format {
        &self.datetime[Self::slot(kind)]
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &RawValue,
    fill: Option<MarkKind>,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let format = formats.plain(fill);
    match value {
        RawValue::Empty => {
            if fill.is_some() {
                worksheet.write_blank(row, col, format)?;
            }
        }
        RawValue::Text(s) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        RawValue::Number(n) if n.is_finite() => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        RawValue::Number(_) => {
            worksheet.write_blank(row, col, format)?;
        }
        RawValue::Bool(b) => {
            worksheet.write_boolean_with_format(row, col, *b, format)?;
        }
        RawValue::DateTime(dt) => {
            worksheet.write_datetime_with_format(row, col, dt, formats.datetime(fill))?;
        }
    }
    Ok(())
}

/// Excel sheet names: at most 31 characters, none of `[]:*?/\`.
pub fn sheet_title(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(31)
        .collect();
    let trimmed = cleaned.trim_matches('\'');
    if trimmed.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        trimmed.to_string()
    }
}

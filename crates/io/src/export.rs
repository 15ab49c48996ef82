// Annotated workbook export
//
// One workbook per reconciled primary sheet, plus the field-master
// missing-record workbook(s). Each is rendered to a buffer, then written.

use std::path::{Path, PathBuf};

use contract_audit_recon::model::{AuditResult, CellMark, MarkKind, MissingReport, RawValue, SheetStatus};
use contract_audit_recon::ReferenceTable;
use tracing::{info, warn};

use crate::error::IoError;
use crate::grid::Grid;
use crate::xlsx::SheetAnnotator;

pub const MISSING_SHEET_NAME: &str = "字段表_漏填检查";
pub const MISSING_ANNOTATED_FILE: &str = "字段表_漏填检查标注版.xlsx";
pub const MISSING_ONLY_FILE: &str = "字段表_漏填清单.xlsx";

pub fn primary_output_name(keyword: &str) -> String {
    format!("记录表_{keyword}_审核标注版.xlsx")
}

/// Which field-master workbooks to write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingExport {
    /// Every row, with the annotation column.
    #[default]
    All,
    /// Missing rows only.
    Missing,
    Both,
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    std::fs::write(path, bytes).map_err(|e| IoError::write(path, e))
}

fn ensure_dir(dir: &Path) -> Result<(), IoError> {
    std::fs::create_dir_all(dir).map_err(|e| IoError::write(dir, e))
}

/// Write one annotated copy of every checked primary sheet.
pub fn export_primary_sheets(
    out_dir: &Path,
    grids: &[Grid],
    result: &AuditResult,
) -> Result<Vec<PathBuf>, IoError> {
    ensure_dir(out_dir)?;
    let mut written = Vec::new();

    for report in &result.sheets {
        if report.status != SheetStatus::Checked {
            continue;
        }
        let Some(name) = report.sheet_name.as_deref() else {
            continue;
        };
        let Some(grid) = grids.iter().find(|g| g.name == name) else {
            warn!(sheet = name, "source sheet not available for export");
            continue;
        };

        let path = out_dir.join(primary_output_name(&report.keyword));
        let bytes = SheetAnnotator::from_marks(&report.marks)
            .render(grid, name)
            .map_err(|e| IoError::write(&path, e))?;
        write_bytes(&path, &bytes)?;
        info!(sheet = name, marks = report.marks.len(), path = %path.display(), "annotated sheet written");
        written.push(path);
    }

    Ok(written)
}

/// Write the field-master workbook(s) with the annotation column.
pub fn export_missing(
    out_dir: &Path,
    grid: &Grid,
    field_master: &ReferenceTable,
    report: &MissingReport,
    mode: MissingExport,
) -> Result<Vec<PathBuf>, IoError> {
    ensure_dir(out_dir)?;
    let mut written = Vec::new();

    if matches!(mode, MissingExport::All | MissingExport::Both) {
        let path = out_dir.join(MISSING_ANNOTATED_FILE);
        let annotated = annotated_grid(grid, field_master, report);
        let bytes = SheetAnnotator::from_marks(&report.marks)
            .render(&annotated, MISSING_SHEET_NAME)
            .map_err(|e| IoError::write(&path, e))?;
        write_bytes(&path, &bytes)?;
        info!(missing = report.missing_count, path = %path.display(), "field master written");
        written.push(path);
    }

    if matches!(mode, MissingExport::Missing | MissingExport::Both) {
        let path = out_dir.join(MISSING_ONLY_FILE);
        let (listing, marks) = missing_only_grid(grid, field_master, report);
        let bytes = SheetAnnotator::from_marks(&marks)
            .render(&listing, MISSING_SHEET_NAME)
            .map_err(|e| IoError::write(&path, e))?;
        write_bytes(&path, &bytes)?;
        info!(missing = report.missing_count, path = %path.display(), "missing-record list written");
        written.push(path);
    }

    Ok(written)
}

/// The source grid with the annotation column appended after the last used column.
fn annotated_grid(grid: &Grid, field_master: &ReferenceTable, report: &MissingReport) -> Grid {
    let table = &field_master.table;
    let col = grid.width().max(table.headers.len());
    let mut out = grid.clone();
    out.name = MISSING_SHEET_NAME.to_string();
    out.set(table.header_row as usize, col, RawValue::Text(report.annotation_column.clone()));

    for (row, label) in table.rows.iter().zip(&report.annotations) {
        if let Some(label) = label {
            out.set(row.physical_row as usize, col, RawValue::Text(label.clone()));
        }
    }
    out
}

/// Header plus missing rows only, packed below it, with fresh marks.
fn missing_only_grid(
    grid: &Grid,
    field_master: &ReferenceTable,
    report: &MissingReport,
) -> (Grid, Vec<CellMark>) {
    let table = &field_master.table;
    let width = grid.width().max(table.headers.len());

    let mut header: Vec<RawValue> = table.headers.iter().map(|h| RawValue::Text(h.clone())).collect();
    header.resize(width, RawValue::Empty);
    header.push(RawValue::Text(report.annotation_column.clone()));

    let mut rows = vec![header];
    let mut marks = Vec::new();
    for &i in &report.missing_rows {
        let Some(source) = table.rows.get(i) else {
            continue;
        };
        let mut cells = grid.rows.get(source.physical_row as usize).cloned().unwrap_or_default();
        cells.resize(width, RawValue::Empty);
        cells.push(RawValue::Text(report.annotations[i].clone().unwrap_or_default()));
        if let Some(id_col) = field_master.id_col {
            marks.push(CellMark { row: rows.len() as u32, col: id_col, kind: MarkKind::Missing });
        }
        rows.push(cells);
    }

    (Grid::new(MISSING_SHEET_NAME, rows), marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contract_audit_recon::ReferenceCategory;

    fn t(s: &str) -> RawValue {
        RawValue::Text(s.into())
    }

    fn fixture() -> (Grid, ReferenceTable, MissingReport) {
        let grid = Grid::new(
            "重卡",
            vec![
                vec![t("合同编号"), t("是否车管家")],
                vec![t("C100"), t("否")],
                vec![t("C200"), t("否")],
                vec![t("C300"), t("否")],
            ],
        );
        let fm = ReferenceTable::new(ReferenceCategory::FieldMaster, grid.to_table(0), "合同");
        let report = MissingReport {
            annotation_column: "漏填检查".into(),
            missing_count: 2,
            missing_ids: vec!["C100".into(), "C300".into()],
            annotations: vec![Some("❗ 漏填".into()), None, Some("❗ 漏填".into())],
            missing_rows: vec![0, 2],
            marks: vec![
                CellMark { row: 1, col: 0, kind: MarkKind::Missing },
                CellMark { row: 3, col: 0, kind: MarkKind::Missing },
            ],
            ..MissingReport::default()
        };
        (grid, fm, report)
    }

    #[test]
    fn annotation_column_follows_last_column() {
        let (grid, fm, report) = fixture();
        let out = annotated_grid(&grid, &fm, &report);
        assert_eq!(out.cell(0, 2), &t("漏填检查"));
        assert_eq!(out.cell(1, 2), &t("❗ 漏填"));
        assert_eq!(out.cell(2, 2), &RawValue::Empty);
        assert_eq!(out.cell(3, 2), &t("❗ 漏填"));
    }

    #[test]
    fn missing_only_packs_rows_and_remarks_them() {
        let (grid, fm, report) = fixture();
        let (out, marks) = missing_only_grid(&grid, &fm, &report);
        assert_eq!(out.rows.len(), 3);
        assert_eq!(out.cell(0, 2), &t("漏填检查"));
        assert_eq!(out.cell(1, 0), &t("C100"));
        assert_eq!(out.cell(2, 0), &t("C300"));
        assert_eq!(
            marks,
            vec![
                CellMark { row: 1, col: 0, kind: MarkKind::Missing },
                CellMark { row: 2, col: 0, kind: MarkKind::Missing },
            ]
        );
    }

    #[test]
    fn export_modes_write_expected_files() {
        let (grid, fm, report) = fixture();
        let dir = tempfile::tempdir().unwrap();

        let all = export_missing(dir.path(), &grid, &fm, &report, MissingExport::All).unwrap();
        assert_eq!(all, vec![dir.path().join(MISSING_ANNOTATED_FILE)]);

        let both = export_missing(dir.path(), &grid, &fm, &report, MissingExport::Both).unwrap();
        assert_eq!(both.len(), 2);
        assert!(dir.path().join(MISSING_ONLY_FILE).exists());
    }

    #[test]
    fn output_names() {
        assert_eq!(primary_output_name("二次"), "记录表_二次_审核标注版.xlsx");
    }
}

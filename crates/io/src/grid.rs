use contract_audit_recon::model::{RawValue, Table, TableRow};

static EMPTY: RawValue = RawValue::Empty;

/// One sheet exactly as laid out in the file: `rows[r][c]` is the cell at
/// 0-based physical row `r`, column `c`. Rows above the first used row are
/// present (and empty) so indices stay physical.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub name: String,
    pub rows: Vec<Vec<RawValue>>,
}

impl Grid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self { name: name.into(), rows }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &RawValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, row: usize, col: usize, value: RawValue) {
        if self.rows.len() <= row {
            self.rows.resize(row + 1, Vec::new());
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, RawValue::Empty);
        }
        cells[col] = value;
    }

    /// View the grid as a table whose header sits at `header_row`.
    ///
    /// Blank header cells are named `Unnamed: {col}`. Fully blank data rows
    /// are dropped; the rest keep their physical row.
    pub fn to_table(&self, header_row: u32) -> Table {
        let width = self.width();
        let hr = header_row as usize;

        let headers = (0..width)
            .map(|c| {
                let text = self.cell(hr, c).display_text();
                if text.trim().is_empty() {
                    format!("Unnamed: {c}")
                } else {
                    text
                }
            })
            .collect();

        let mut table = Table::new(self.name.clone(), headers, header_row);
        for (r, cells) in self.rows.iter().enumerate().skip(hr + 1) {
            if cells.iter().all(RawValue::is_missing) {
                continue;
            }
            let mut cells = cells.clone();
            cells.resize(width, RawValue::Empty);
            table.rows.push(TableRow { physical_row: r as u32, cells });
        }
        table
    }
}

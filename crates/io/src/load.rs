use std::path::Path;

use contract_audit_recon::model::{ReferenceCategory, Table, Workbook};
use contract_audit_recon::{AuditConfig, AuditInput, ReferenceSet};
use tracing::info;

use crate::discover::{FileKind, InputSet};
use crate::error::IoError;
use crate::grid::Grid;
use crate::{csv, xlsx};

fn kind(path: &Path) -> Result<FileKind, IoError> {
    FileKind::of(path).ok_or_else(|| IoError::Unsupported { path: path.to_path_buf() })
}

/// Every sheet of a file as physical grids. A CSV file is one sheet.
pub fn load_grids(path: &Path) -> Result<Vec<Grid>, IoError> {
    match kind(path)? {
        FileKind::Excel => xlsx::import_all(path),
        FileKind::Csv => Ok(vec![csv::import(path)?]),
    }
}

/// The sheet whose name contains `sheet_keyword`, or the first sheet.
/// CSV files have a single sheet, so the keyword does not apply to them.
pub fn load_grid(path: &Path, sheet_keyword: Option<&str>) -> Result<Grid, IoError> {
    match kind(path)? {
        FileKind::Excel => xlsx::import_sheet(path, sheet_keyword),
        FileKind::Csv => csv::import(path),
    }
}

pub fn load_workbook(path: &Path, header_row: u32) -> Result<Workbook, IoError> {
    let grids = load_grids(path)?;
    Ok(Workbook { sheets: grids.iter().map(|g| g.to_table(header_row)).collect() })
}

pub fn load_table(path: &Path, sheet_keyword: Option<&str>, header_row: u32) -> Result<Table, IoError> {
    Ok(load_grid(path, sheet_keyword)?.to_table(header_row))
}

/// All inputs of a run, kept as grids so exports can copy the source layout.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub primary: Vec<Grid>,
    pub references: Vec<(ReferenceCategory, Grid)>,
}

impl LoadedInputs {
    pub fn load(inputs: &InputSet, config: &AuditConfig) -> Result<Self, IoError> {
        let primary = load_grids(&inputs.primary)?;
        info!(path = %inputs.primary.display(), sheets = primary.len(), "primary workbook loaded");

        let mut references = Vec::with_capacity(inputs.references.len());
        for (category, path) in &inputs.references {
            let sheet_keyword = config.reference(*category).and_then(|r| r.sheet_keyword.as_deref());
            let grid = load_grid(path, sheet_keyword)?;
            info!(category = %category, sheet = %grid.name, rows = grid.rows.len(), "reference loaded");
            references.push((*category, grid));
        }

        Ok(Self { primary, references })
    }

    pub fn reference_grid(&self, category: ReferenceCategory) -> Option<&Grid> {
        self.references.iter().find(|(c, _)| *c == category).map(|(_, g)| g)
    }

    pub fn primary_grid(&self, sheet_name: &str) -> Option<&Grid> {
        self.primary.iter().find(|g| g.name == sheet_name)
    }

    /// Tables for the engine, each read with its configured header row.
    pub fn audit_input(&self, config: &AuditConfig) -> AuditInput {
        let primary = Workbook {
            sheets: self
                .primary
                .iter()
                .map(|g| g.to_table(config.primary.header_row))
                .collect(),
        };
        let tables = self
            .references
            .iter()
            .map(|(category, grid)| {
                let header_row = config.reference(*category).map(|r| r.header_row).unwrap_or(0);
                (*category, grid.to_table(header_row))
            })
            .collect();
        AuditInput { primary, references: ReferenceSet::from_tables(config, tables) }
    }
}

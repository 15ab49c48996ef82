use std::collections::HashMap;

use tracing::warn;

use crate::config::AuditConfig;
use crate::model::{ReferenceCategory, ReferenceSummary, Table, TableRow};
use crate::resolve::resolve_column;

/// A reference table with its identifier column resolved and indexed.
///
/// The index keeps the first row per identifier. Later rows with the same
/// identifier are never consulted; they are counted in `duplicate_ids`.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    pub category: ReferenceCategory,
    pub table: Table,
    pub id_col: Option<usize>,
    index: HashMap<String, usize>,
    duplicate_ids: Vec<String>,
}

impl ReferenceTable {
    pub fn new(category: ReferenceCategory, table: Table, id_keyword: &str) -> Self {
        let id_col = resolve_column(&table, id_keyword, false);
        let mut index = HashMap::new();
        let mut duplicate_ids = Vec::new();

        match id_col {
            Some(col) => {
                for (i, row) in table.rows.iter().enumerate() {
                    let Some(id) = row.get(col).identifier() else {
                        continue;
                    };
                    if index.contains_key(&id) {
                        if !duplicate_ids.contains(&id) {
                            duplicate_ids.push(id);
                        }
                    } else {
                        index.insert(id, i);
                    }
                }
            }
            None => warn!(
                table = %table.name,
                category = %category,
                keyword = id_keyword,
                "reference table has no identifier column; its fields will be skipped"
            ),
        }

        if !duplicate_ids.is_empty() {
            warn!(
                table = %table.name,
                category = %category,
                count = duplicate_ids.len(),
                "duplicate identifiers in reference table; the first row of each wins"
            );
        }

        Self { category, table, id_col, index, duplicate_ids }
    }

    /// First row whose trimmed identifier equals `id`.
    pub fn lookup(&self, id: &str) -> Option<&TableRow> {
        self.index.get(id).map(|&i| &self.table.rows[i])
    }

    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicate_ids
    }

    pub fn summary(&self) -> ReferenceSummary {
        ReferenceSummary {
            category: self.category,
            table: self.table.name.clone(),
            rows: self.table.rows.len(),
            identifier_column: self.id_col.map(|c| self.table.headers[c].clone()),
            duplicate_reference_ids: self.duplicate_ids.clone(),
        }
    }
}

/// At most one reference table per category, kept in processing order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    tables: Vec<ReferenceTable>,
}

impl ReferenceSet {
    pub fn new(mut tables: Vec<ReferenceTable>) -> Self {
        tables.sort_by_key(|t| t.category);
        tables.dedup_by_key(|t| t.category);
        Self { tables }
    }

    /// Index loaded tables using each category's configured identifier keyword.
    pub fn from_tables(config: &AuditConfig, tables: Vec<(ReferenceCategory, Table)>) -> Self {
        let indexed = tables
            .into_iter()
            .map(|(category, table)| {
                let keyword = config
                    .reference(category)
                    .map(|r| r.id_keyword.as_str())
                    .unwrap_or(config.primary.id_keyword.as_str());
                ReferenceTable::new(category, table, keyword)
            })
            .collect();
        Self::new(indexed)
    }

    pub fn get(&self, category: ReferenceCategory) -> Option<&ReferenceTable> {
        self.tables.iter().find(|t| t.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceTable> {
        self.tables.iter()
    }
}

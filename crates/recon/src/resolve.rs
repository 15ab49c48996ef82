//! Keyword → column / sheet resolution.
//!
//! Candidates are scanned left to right (workbook order for sheets); the
//! first match wins and ambiguity is logged, never silently swallowed.

use tracing::warn;

use crate::error::ReconError;
use crate::model::{Table, Workbook};

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

/// All header indices matching `keyword`, in column order.
pub fn column_candidates(headers: &[String], keyword: &str, exact: bool) -> Vec<usize> {
    let key = fold(keyword);
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            let name = fold(h);
            if exact {
                name == key
            } else {
                name.contains(&key)
            }
        })
        .map(|(i, _)| i)
        .collect()
}

/// Resolve a column keyword to the first matching header index.
pub fn resolve_column(table: &Table, keyword: &str, exact: bool) -> Option<usize> {
    let candidates = column_candidates(&table.headers, keyword, exact);
    if candidates.len() > 1 {
        let names: Vec<&str> = candidates.iter().map(|&i| table.headers[i].as_str()).collect();
        warn!(
            table = %table.name,
            keyword,
            candidates = ?names,
            "ambiguous column keyword, using '{}'",
            names[0]
        );
    }
    candidates.first().copied()
}

/// Like [`resolve_column`] but a miss is an error.
pub fn require_column(table: &Table, keyword: &str, exact: bool) -> Result<usize, ReconError> {
    resolve_column(table, keyword, exact).ok_or_else(|| ReconError::MissingColumn {
        table: table.name.clone(),
        keyword: keyword.to_string(),
    })
}

/// All sheet indices whose name contains `keyword`, in workbook order.
pub fn sheet_candidates(names: &[String], keyword: &str) -> Vec<usize> {
    let key = keyword.trim();
    names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.contains(key))
        .map(|(i, _)| i)
        .collect()
}

/// Index of the first sheet whose name contains `keyword`.
pub fn resolve_sheet_index(names: &[String], keyword: &str) -> Result<usize, ReconError> {
    let candidates = sheet_candidates(names, keyword);
    if candidates.len() > 1 {
        let matched: Vec<&str> = candidates.iter().map(|&i| names[i].as_str()).collect();
        warn!(
            keyword,
            candidates = ?matched,
            "ambiguous sheet keyword, using '{}'",
            matched[0]
        );
    }
    candidates
        .first()
        .copied()
        .ok_or_else(|| ReconError::SheetNotFound { keyword: keyword.to_string() })
}

pub fn resolve_sheet<'a>(workbook: &'a Workbook, keyword: &str) -> Result<&'a Table, ReconError> {
    let idx = resolve_sheet_index(&workbook.sheet_names(), keyword)?;
    Ok(&workbook.sheets[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn table(names: &[&str]) -> Table {
        Table::new("t", headers(names), 0)
    }

    #[test]
    fn substring_match_is_case_folded_and_trimmed() {
        let t = table(&["序号", " Contract No ", "金额"]);
        assert_eq!(resolve_column(&t, "contract", false), Some(1));
        assert_eq!(resolve_column(&t, "  CONTRACT no", false), Some(1));
    }

    #[test]
    fn exact_requires_full_name() {
        let t = table(&["城市经理助理", "城市经理"]);
        assert_eq!(resolve_column(&t, "城市经理", true), Some(1));
        assert_eq!(resolve_column(&t, "城市经理", false), Some(0));
        assert_eq!(resolve_column(&t, "经理", true), None);
    }

    #[test]
    fn first_match_wins_left_to_right() {
        let h = headers(&["合同号", "原合同号", "合同金额"]);
        assert_eq!(column_candidates(&h, "合同", false), vec![0, 1, 2]);
        assert_eq!(resolve_column(&table(&["合同号", "原合同号"]), "合同", false), Some(0));
    }

    #[test]
    fn missing_column_is_none_or_error() {
        let t = table(&["a", "b"]);
        assert_eq!(resolve_column(&t, "合同", false), None);
        let err = require_column(&t, "合同", false).unwrap_err();
        assert_eq!(
            err,
            ReconError::MissingColumn { table: "t".into(), keyword: "合同".into() }
        );
    }

    #[test]
    fn sheet_substring_in_workbook_order() {
        let names = headers(&["汇总", "二次租赁", "部分担保", "二次(旧)"]);
        assert_eq!(resolve_sheet_index(&names, "二次").unwrap(), 1);
        assert_eq!(resolve_sheet_index(&names, "部分担保").unwrap(), 2);
    }

    #[test]
    fn sheet_not_found_is_named_error() {
        let wb = Workbook { sheets: vec![table(&["x"])] };
        let err = resolve_sheet(&wb, "随州").unwrap_err();
        assert_eq!(err, ReconError::SheetNotFound { keyword: "随州".into() });
        assert!(err.to_string().contains("随州"));
    }
}

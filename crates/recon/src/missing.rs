use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::config::MissingRules;
use crate::model::{AnnotationSink, CellMark, MarkKind, MissingReport, RawValue};
use crate::reference::ReferenceTable;
use crate::resolve::resolve_column;

/// Flag field-master identifiers that no primary sheet mentioned.
///
/// A row is missing when its identifier is non-empty, not in `seen`, not
/// managed by a third party, and its bonus type is not exempt. Exemption
/// columns that the table lacks are simply not applied.
pub fn detect_missing(
    field_master: &ReferenceTable,
    seen: &BTreeSet<String>,
    rules: &MissingRules,
    sink: &mut dyn AnnotationSink,
) -> MissingReport {
    let table = &field_master.table;
    let mut report = MissingReport {
        annotation_column: rules.annotation_column.clone(),
        annotations: vec![None; table.rows.len()],
        ..MissingReport::default()
    };

    let Some(id_col) = field_master.id_col else {
        warn!(table = %table.name, "field master has no identifier column; missing-record check skipped");
        return report;
    };

    let third_party_col = rules
        .third_party_column
        .as_deref()
        .and_then(|name| resolve_column(table, name, true));
    let bonus_col = rules
        .bonus_type_column
        .as_deref()
        .and_then(|name| resolve_column(table, name, true));
    report.third_party_column = third_party_col.map(|c| table.headers[c].clone());
    report.bonus_type_column = bonus_col.map(|c| table.headers[c].clone());

    let marker = rules.third_party_marker.trim().to_lowercase();

    for (i, row) in table.rows.iter().enumerate() {
        let Some(id) = row.get(id_col).identifier() else {
            continue;
        };
        if seen.contains(&id) {
            continue;
        }
        if let Some(col) = third_party_col {
            if cell_text(row.get(col)).to_lowercase() == marker {
                continue;
            }
        }
        if let Some(col) = bonus_col {
            let bonus = cell_text(row.get(col));
            if rules.excluded_bonus_types.iter().any(|e| e.trim() == bonus) {
                continue;
            }
        }

        report.annotations[i] = Some(rules.annotation_label.clone());
        report.missing_rows.push(i);
        report.missing_ids.push(id);
        sink.mark(CellMark { row: row.physical_row, col: id_col, kind: MarkKind::Missing });
    }

    report.missing_count = report.missing_rows.len();
    info!(
        table = %table.name,
        missing = report.missing_count,
        seen = seen.len(),
        "missing-record check done"
    );
    report
}

fn cell_text(value: &RawValue) -> String {
    value.display_text().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::config::Variant;
    use crate::model::{ReferenceCategory, Table};

    fn t(s: &str) -> RawValue {
        RawValue::Text(s.into())
    }

    fn field_master() -> ReferenceTable {
        let table = Table::with_rows(
            "重卡",
            &["合同编号", "是否车管家", "提成类型"],
            0,
            vec![
                vec![t("C100"), t("否"), t("普通")],
                vec![t("C200"), t("否"), t("普通")],
                vec![t("C300"), t(" 是 "), t("普通")],
                vec![t("C400"), t("否"), t("联合租赁")],
                vec![t("C500"), RawValue::Empty, t("驻店")],
                vec![RawValue::Empty, t("否"), t("普通")],
            ],
        );
        ReferenceTable::new(ReferenceCategory::FieldMaster, table, "合同")
    }

    fn seen(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unseen_identifier_is_missing() {
        let rules = AuditConfig::preset(Variant::Standard).missing;
        let mut marks: Vec<CellMark> = Vec::new();
        let report = detect_missing(&field_master(), &seen(&["C100"]), &rules, &mut marks);

        assert_eq!(report.missing_ids, vec!["C200"]);
        assert_eq!(report.missing_count, 1);
        assert_eq!(report.missing_rows, vec![1]);
        assert_eq!(report.annotations[1].as_deref(), Some("❗ 漏填"));
        assert_eq!(report.annotations.iter().filter(|a| a.is_some()).count(), 1);
        assert_eq!(marks, vec![CellMark { row: 2, col: 0, kind: MarkKind::Missing }]);
        assert_eq!(report.third_party_column.as_deref(), Some("是否车管家"));
        assert_eq!(report.bonus_type_column.as_deref(), Some("提成类型"));
    }

    #[test]
    fn third_party_flag_suppresses() {
        let rules = AuditConfig::preset(Variant::Standard).missing;
        let mut marks: Vec<CellMark> = Vec::new();
        let report = detect_missing(&field_master(), &seen(&[]), &rules, &mut marks);
        assert!(!report.missing_ids.contains(&"C300".to_string()));
    }

    #[test]
    fn exclusions_differ_by_variant() {
        let mut marks: Vec<CellMark> = Vec::new();
        let standard = detect_missing(
            &field_master(),
            &seen(&[]),
            &AuditConfig::preset(Variant::Standard).missing,
            &mut marks,
        );
        assert_eq!(standard.missing_ids, vec!["C100", "C200"]);

        let on_site = detect_missing(
            &field_master(),
            &seen(&[]),
            &AuditConfig::preset(Variant::OnSite).missing,
            &mut marks,
        );
        assert_eq!(on_site.missing_ids, vec!["C100", "C200", "C500"]);
    }

    #[test]
    fn absent_exclusion_columns_are_not_applied() {
        let table = Table::with_rows(
            "重卡",
            &["合同编号", "车管家标记"],
            0,
            vec![vec![t("C100"), t("是")]],
        );
        let fm = ReferenceTable::new(ReferenceCategory::FieldMaster, table, "合同");
        let rules = AuditConfig::default().missing;
        let mut marks: Vec<CellMark> = Vec::new();
        let report = detect_missing(&fm, &seen(&[]), &rules, &mut marks);
        assert_eq!(report.missing_ids, vec!["C100"]);
        assert_eq!(report.third_party_column, None);
    }

    #[test]
    fn no_identifier_column_flags_nothing() {
        let table = Table::with_rows("重卡", &["编号"], 0, vec![vec![t("C100")]]);
        let fm = ReferenceTable::new(ReferenceCategory::FieldMaster, table, "合同");
        let mut marks: Vec<CellMark> = Vec::new();
        let report = detect_missing(&fm, &seen(&[]), &AuditConfig::default().missing, &mut marks);
        assert_eq!(report.missing_count, 0);
        assert_eq!(report.annotations, vec![None]);
        assert!(marks.is_empty());
    }
}

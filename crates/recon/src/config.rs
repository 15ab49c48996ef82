use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::ReferenceCategory;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    pub name: String,
    #[serde(default)]
    pub variant: Variant,
    pub primary: PrimaryConfig,
    pub references: Vec<ReferenceConfig>,
    #[serde(default)]
    pub compare: CompareConfig,
    pub missing: MissingRules,
}

/// The two run variants observed in production. They differ in which
/// primary sheets are scanned and which bonus types are exempt from the
/// missing-record check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Sheets 二次 / 部分担保 / 随州; exempt 联合租赁 and 驻店.
    #[default]
    Standard,
    /// Adds the 驻店客户 sheet; exempts 联合租赁 only.
    OnSite,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::OnSite => write!(f, "on_site"),
        }
    }
}

// ---------------------------------------------------------------------------
// Primary + reference tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryConfig {
    /// Substring of the record workbook's file name.
    pub file_keyword: String,
    #[serde(default = "default_id_keyword")]
    pub id_keyword: String,
    /// 0-based header row inside each primary sheet.
    #[serde(default = "default_primary_header_row")]
    pub header_row: u32,
    /// Sheet keywords, processed in this order.
    pub sheets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub category: ReferenceCategory,
    pub file_keyword: String,
    /// Sheet to read; the first sheet when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_keyword: Option<String>,
    #[serde(default)]
    pub header_row: u32,
    #[serde(default = "default_id_keyword")]
    pub id_keyword: String,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

/// One (primary keyword, reference keyword) mapping pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub primary: String,
    pub reference: String,
    /// Resolve both columns by exact (case-folded) name instead of substring.
    #[serde(default)]
    pub exact: bool,
    /// Numeric tolerance for this pair; `compare.default_tolerance` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    /// Skip (and count) the comparison when the reference cell is blank or a
    /// placeholder such as `-`.
    #[serde(default)]
    pub skip_blank_reference: bool,
}

impl FieldRule {
    pub fn new(primary: &str, reference: &str) -> Self {
        Self {
            primary: primary.into(),
            reference: reference.into(),
            exact: false,
            tolerance: None,
            skip_blank_reference: false,
        }
    }

    fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    fn exact_skip_blank(mut self) -> Self {
        self.exact = true;
        self.skip_blank_reference = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Compare + missing rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// A pair whose primary or reference keyword contains one of these is
    /// compared as a date (year/month/day only).
    pub date_markers: Vec<String>,
    pub default_tolerance: f64,
    /// Reference values that count as "not recorded" for `skip_blank_reference`.
    pub blank_markers: Vec<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            date_markers: vec!["日期".into(), "时间".into()],
            default_tolerance: 1e-6,
            blank_markers: vec![
                "".into(),
                "-".into(),
                "nan".into(),
                "none".into(),
                "null".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRules {
    /// Exact column name of the "managed by a third party" flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_column: Option<String>,
    #[serde(default = "default_third_party_marker")]
    pub third_party_marker: String,
    /// Exact column name of the bonus/commission type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_type_column: Option<String>,
    #[serde(default)]
    pub excluded_bonus_types: Vec<String>,
    #[serde(default = "default_annotation_column")]
    pub annotation_column: String,
    #[serde(default = "default_annotation_label")]
    pub annotation_label: String,
}

fn default_id_keyword() -> String {
    "合同".into()
}

fn default_primary_header_row() -> u32 {
    1
}

fn default_third_party_marker() -> String {
    "是".into()
}

fn default_annotation_column() -> String {
    "漏填检查".into()
}

fn default_annotation_label() -> String {
    "❗ 漏填".into()
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

impl AuditConfig {
    /// Built-in configuration for a run variant.
    pub fn preset(variant: Variant) -> Self {
        let mut sheets = vec!["二次".to_string(), "部分担保".into(), "随州".into()];
        let mut excluded_bonus_types = vec!["联合租赁".to_string()];
        match variant {
            Variant::Standard => excluded_bonus_types.push("驻店".into()),
            Variant::OnSite => sheets.push("驻店客户".into()),
        }

        Self {
            name: "人事合同记录表审核".into(),
            variant,
            primary: PrimaryConfig {
                file_keyword: "记录表".into(),
                id_keyword: default_id_keyword(),
                header_row: 1,
                sheets,
            },
            references: vec![
                ReferenceConfig {
                    category: ReferenceCategory::FundingDetail,
                    file_keyword: "放款明细".into(),
                    sheet_keyword: Some("本司".into()),
                    header_row: 0,
                    id_keyword: default_id_keyword(),
                    fields: vec![
                        FieldRule::new("授信方", "授信"),
                        FieldRule::new("租赁本金", "本金"),
                        FieldRule::new("租赁期限月", "租赁期限月"),
                        FieldRule::new("客户经理", "客户经理"),
                        FieldRule::new("起租收益率", "收益率"),
                        FieldRule::new("主车台数", "主车台数"),
                        FieldRule::new("挂车台数", "挂车台数"),
                    ],
                },
                ReferenceConfig {
                    category: ReferenceCategory::FieldMaster,
                    file_keyword: "字段".into(),
                    sheet_keyword: Some("重卡".into()),
                    header_row: 0,
                    id_keyword: default_id_keyword(),
                    fields: vec![
                        FieldRule::new("保证金比例", "保证金比例_2").with_tolerance(0.005),
                        FieldRule::new("项目提报人", "提报"),
                        FieldRule::new("起租时间", "起租日_商"),
                        FieldRule::new("租赁期限月", "总期数_商_资产"),
                        FieldRule::new("所属省区", "区域"),
                        FieldRule::new("城市经理", "城市经理").exact_skip_blank(),
                    ],
                },
                ReferenceConfig {
                    category: ReferenceCategory::SecondaryDetail,
                    file_keyword: "二次明细".into(),
                    sheet_keyword: None,
                    header_row: 0,
                    id_keyword: default_id_keyword(),
                    fields: vec![FieldRule::new("二次时间", "出本流程时间")],
                },
                ReferenceConfig {
                    category: ReferenceCategory::HeavyTruck,
                    file_keyword: "重卡数据".into(),
                    sheet_keyword: None,
                    header_row: 0,
                    id_keyword: default_id_keyword(),
                    fields: vec![FieldRule::new("结清日期", "核销")],
                },
            ],
            compare: CompareConfig::default(),
            missing: MissingRules {
                third_party_column: Some("是否车管家".into()),
                third_party_marker: default_third_party_marker(),
                bonus_type_column: Some("提成类型".into()),
                excluded_bonus_types,
                annotation_column: default_annotation_column(),
                annotation_label: default_annotation_label(),
            },
        }
    }

    pub fn reference(&self, category: ReferenceCategory) -> Option<&ReferenceConfig> {
        self.references.iter().find(|r| r.category == category)
    }

    pub fn is_date_field(&self, rule: &FieldRule) -> bool {
        self.compare
            .date_markers
            .iter()
            .any(|m| rule.primary.contains(m.as_str()) || rule.reference.contains(m.as_str()))
    }

    pub fn tolerance_for(&self, rule: &FieldRule) -> f64 {
        rule.tolerance.unwrap_or(self.compare.default_tolerance)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::preset(Variant::Standard)
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AuditConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: AuditConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.primary.file_keyword.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "primary.file_keyword must not be empty".into(),
            ));
        }
        if self.primary.id_keyword.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "primary.id_keyword must not be empty".into(),
            ));
        }
        if self.primary.sheets.is_empty() {
            return Err(ReconError::ConfigValidation(
                "primary.sheets must list at least one sheet keyword".into(),
            ));
        }
        if let Some(blank) = self.primary.sheets.iter().position(|s| s.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(format!(
                "primary.sheets[{blank}] is empty"
            )));
        }

        // Exactly one table per category
        for category in ReferenceCategory::ALL {
            let count = self.references.iter().filter(|r| r.category == category).count();
            if count != 1 {
                return Err(ReconError::ConfigValidation(format!(
                    "expected exactly one '{category}' reference table, found {count}"
                )));
            }
        }

        for reference in &self.references {
            if reference.file_keyword.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "references.{}: file_keyword must not be empty",
                    reference.category
                )));
            }
            if reference.id_keyword.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "references.{}: id_keyword must not be empty",
                    reference.category
                )));
            }
            for rule in &reference.fields {
                if rule.primary.trim().is_empty() || rule.reference.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "references.{}: field keywords must not be empty",
                        reference.category
                    )));
                }
                if let Some(tol) = rule.tolerance {
                    if !tol.is_finite() || tol < 0.0 {
                        return Err(ReconError::ConfigValidation(format!(
                            "references.{}: tolerance for '{}' must be a non-negative number, got {tol}",
                            reference.category, rule.primary
                        )));
                    }
                }
            }
        }

        // File keywords must not be able to claim each other's files
        let mut keywords: Vec<&str> = vec![self.primary.file_keyword.as_str()];
        keywords.extend(self.references.iter().map(|r| r.file_keyword.as_str()));
        for (i, a) in keywords.iter().enumerate() {
            if keywords.iter().skip(i + 1).any(|b| a == b) {
                return Err(ReconError::ConfigValidation(format!(
                    "file keyword '{a}' is used by more than one input"
                )));
            }
        }

        let tol = self.compare.default_tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "compare.default_tolerance must be a non-negative number, got {tol}"
            )));
        }

        if self.missing.annotation_column.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "missing.annotation_column must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "Minimal"

[primary]
file_keyword = "记录表"
sheets = ["二次"]

[[references]]
category = "funding_detail"
file_keyword = "放款明细"
sheet_keyword = "本司"
fields = [
  { primary = "租赁本金", reference = "本金" },
]

[[references]]
category = "field_master"
file_keyword = "字段"
fields = [
  { primary = "保证金比例", reference = "保证金比例_2", tolerance = 0.005 },
  { primary = "城市经理", reference = "城市经理", exact = true, skip_blank_reference = true },
]

[[references]]
category = "secondary_detail"
file_keyword = "二次明细"

[[references]]
category = "heavy_truck"
file_keyword = "重卡数据"

[missing]
third_party_column = "是否车管家"
bonus_type_column = "提成类型"
excluded_bonus_types = ["联合租赁"]
"#;

    #[test]
    fn parse_minimal_fills_defaults() {
        let config = AuditConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.variant, Variant::Standard);
        assert_eq!(config.primary.header_row, 1);
        assert_eq!(config.primary.id_keyword, "合同");
        assert_eq!(config.compare.default_tolerance, 1e-6);
        assert_eq!(config.missing.third_party_marker, "是");
        assert_eq!(config.missing.annotation_column, "漏填检查");

        let fm = config.reference(ReferenceCategory::FieldMaster).unwrap();
        assert_eq!(fm.header_row, 0);
        assert!(fm.sheet_keyword.is_none());
        assert_eq!(config.tolerance_for(&fm.fields[0]), 0.005);
        assert_eq!(config.tolerance_for(&fm.fields[1]), 1e-6);
        assert!(fm.fields[1].exact);
        assert!(fm.fields[1].skip_blank_reference);
    }

    #[test]
    fn presets_differ_only_where_variants_differ() {
        let standard = AuditConfig::preset(Variant::Standard);
        let on_site = AuditConfig::preset(Variant::OnSite);

        assert_eq!(standard.primary.sheets, vec!["二次", "部分担保", "随州"]);
        assert_eq!(on_site.primary.sheets, vec!["二次", "部分担保", "随州", "驻店客户"]);
        assert_eq!(standard.missing.excluded_bonus_types, vec!["联合租赁", "驻店"]);
        assert_eq!(on_site.missing.excluded_bonus_types, vec!["联合租赁"]);
        assert_eq!(standard.references, on_site.references);

        standard.validate().unwrap();
        on_site.validate().unwrap();
    }

    #[test]
    fn preset_mapping_matches_source_tables() {
        let config = AuditConfig::default();
        let counts: Vec<usize> = ReferenceCategory::ALL
            .iter()
            .map(|c| config.reference(*c).unwrap().fields.len())
            .collect();
        assert_eq!(counts, vec![7, 6, 1, 1]);

        let fm = config.reference(ReferenceCategory::FieldMaster).unwrap();
        let margin = fm.fields.iter().find(|f| f.primary == "保证金比例").unwrap();
        assert_eq!(margin.reference, "保证金比例_2");
        assert_eq!(margin.tolerance, Some(0.005));

        let skipping: Vec<&str> = config
            .references
            .iter()
            .flat_map(|r| r.fields.iter())
            .filter(|f| f.skip_blank_reference)
            .map(|f| f.primary.as_str())
            .collect();
        assert_eq!(skipping, vec!["城市经理"]);
    }

    #[test]
    fn date_fields_follow_markers() {
        let config = AuditConfig::default();
        assert!(config.is_date_field(&FieldRule::new("起租时间", "起租日_商")));
        assert!(config.is_date_field(&FieldRule::new("结清日期", "核销")));
        assert!(!config.is_date_field(&FieldRule::new("租赁本金", "本金")));
    }

    #[test]
    fn preset_survives_toml_round_trip() {
        let config = AuditConfig::preset(Variant::OnSite);
        let text = config.to_toml().unwrap();
        let parsed = AuditConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn reject_missing_category() {
        let input = MINIMAL.replace(
            "[[references]]\ncategory = \"heavy_truck\"\nfile_keyword = \"重卡数据\"\n",
            "",
        );
        let err = AuditConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("heavy_truck"), "{err}");
    }

    #[test]
    fn reject_negative_tolerance() {
        let input = MINIMAL.replace("tolerance = 0.005", "tolerance = -0.5");
        let err = AuditConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("non-negative"), "{err}");
    }

    #[test]
    fn reject_empty_sheet_list() {
        let input = MINIMAL.replace("sheets = [\"二次\"]", "sheets = []");
        let err = AuditConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("primary.sheets"), "{err}");
    }

    #[test]
    fn reject_duplicate_file_keyword() {
        let input = MINIMAL.replace("file_keyword = \"重卡数据\"", "file_keyword = \"字段\"");
        let err = AuditConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("more than one input"), "{err}");
    }

    #[test]
    fn reject_unknown_variant() {
        let input = format!("variant = \"weekly\"\n{MINIMAL}");
        let err = AuditConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}

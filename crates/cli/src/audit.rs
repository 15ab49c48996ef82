//! `contract-audit run` / `validate` / `show-config`.

use std::path::{Path, PathBuf};

use contract_audit_io::{discover, export_missing, export_primary_sheets, IoError, LoadedInputs, MissingExport};
use contract_audit_recon::model::SheetStatus;
use contract_audit_recon::{AuditConfig, AuditResult, ReferenceCategory, Variant};
use tracing::{debug, info};

use crate::exit_codes::{io_exit_code, EXIT_ERROR, EXIT_EXPORT, EXIT_FINDINGS, EXIT_INVALID_CONFIG};
use crate::CliError;

pub struct RunArgs {
    pub inputs: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub variant: Variant,
    pub out_dir: PathBuf,
    pub missing_export: MissingExport,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub no_export: bool,
}

fn io_err(err: IoError, config: &AuditConfig) -> CliError {
    let code = io_exit_code(&err);
    let hint = match &err {
        IoError::MissingInput { .. } => Some(format!("file names must contain: {}", expected_keywords(config))),
        IoError::SheetNotFound { .. } => Some("check sheet_keyword in the config".to_string()),
        IoError::Unsupported { .. } => Some("supported: xlsx, xlsm, xls, xlsb, ods, csv".to_string()),
        _ => None,
    };
    CliError { code, message: err.to_string(), hint }
}

fn expected_keywords(config: &AuditConfig) -> String {
    std::iter::once(config.primary.file_keyword.as_str())
        .chain(config.references.iter().map(|r| r.file_keyword.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The config file if one is given, otherwise the preset for `variant`.
pub fn load_config(path: Option<&Path>, variant: Variant) -> Result<AuditConfig, CliError> {
    let Some(path) = path else {
        return Ok(AuditConfig::preset(variant));
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    AuditConfig::from_toml(&text).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, e.to_string())
            .with_hint("contract-audit show-config prints a valid starting point")
    })
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref(), args.variant)?;
    info!(config = %config.name, variant = %config.variant, "configuration loaded");

    let inputs = discover(&args.inputs, &config).map_err(|e| io_err(e, &config))?;
    let loaded = LoadedInputs::load(&inputs, &config).map_err(|e| io_err(e, &config))?;
    let input = loaded.audit_input(&config);

    let result = contract_audit_recon::run(&config, &input)
        .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))?;

    let mut written = Vec::new();
    if args.no_export {
        debug!("export disabled");
    } else {
        let map_export = |e: IoError| CliError::new(EXIT_EXPORT, e.to_string());
        written.extend(export_primary_sheets(&args.out_dir, &loaded.primary, &result).map_err(map_export)?);

        let grid = loaded.reference_grid(ReferenceCategory::FieldMaster);
        let table = input.references.get(ReferenceCategory::FieldMaster);
        if let (Some(grid), Some(table)) = (grid, table) {
            written.extend(
                export_missing(&args.out_dir, grid, table, &result.missing, args.missing_export)
                    .map_err(map_export)?,
            );
        }
    }

    if args.json || args.output.is_some() {
        let json_str = result
            .to_json_pretty()
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = args.output {
            std::fs::write(path, &json_str).map_err(|e| {
                CliError::new(EXIT_EXPORT, format!("cannot write output {}: {e}", path.display()))
            })?;
            written.push(path.clone());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    for line in summary_lines(&result) {
        eprintln!("{line}");
    }
    for path in &written {
        eprintln!("wrote {}", path.display());
    }

    if result.has_findings() {
        return Err(CliError::new(
            EXIT_FINDINGS,
            format!(
                "{} mismatch(es), {} missing record(s) need review",
                result.summary.mismatches, result.summary.missing
            ),
        ));
    }
    Ok(())
}

/// Human summary, one line per sheet plus totals.
fn summary_lines(result: &AuditResult) -> Vec<String> {
    let mut lines = Vec::with_capacity(result.sheets.len() + 2);
    for sheet in &result.sheets {
        let line = match sheet.status {
            SheetStatus::Checked => format!(
                "sheet '{}' ({}): {} rows, {} mismatches, {} blank-reference skips",
                sheet.sheet_name.as_deref().unwrap_or_default(),
                sheet.keyword,
                sheet.rows_checked,
                sheet.mismatches,
                sheet.skipped_blank_reference,
            ),
            SheetStatus::SheetNotFound => format!("sheet '{}': not found, skipped", sheet.keyword),
            SheetStatus::IdentifierColumnMissing => format!(
                "sheet '{}': no identifier column, skipped",
                sheet.sheet_name.as_deref().unwrap_or(&sheet.keyword),
            ),
        };
        lines.push(line);
    }

    let s = &result.summary;
    lines.push(format!(
        "audit '{}': {} sheets checked, {} skipped, {} mismatches, {} blank-reference skips, {} identifiers seen",
        result.meta.config_name,
        s.sheets_checked,
        s.sheets_skipped,
        s.mismatches,
        s.skipped_blank_reference,
        s.identifiers_seen,
    ));
    lines.push(format!("missing: {} field-master record(s) not in any sheet", s.missing));
    lines
}

pub fn cmd_validate(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(Some(config_path), Variant::default())?;
    let rules: usize = config.references.iter().map(|r| r.fields.len()).sum();
    eprintln!(
        "valid: '{}' ({}) with {} sheet keyword(s), {} reference table(s), {} field rule(s)",
        config.name,
        config.variant,
        config.primary.sheets.len(),
        config.references.len(),
        rules,
    );
    Ok(())
}

pub fn cmd_show_config(variant: Variant) -> Result<(), CliError> {
    let text = AuditConfig::preset(variant)
        .to_toml()
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    print!("{text}");
    Ok(())
}

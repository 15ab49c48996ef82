// contract-audit - reconcile a contract record workbook against its reference tables

mod audit;
mod exit_codes;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use contract_audit_io::MissingExport;
use contract_audit_recon::Variant;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "contract-audit")]
#[command(about = "Reconcile contract record sheets against reference tables and flag missing records")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors in the log
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the record workbook and export annotated copies
    #[command(after_help = "\
Examples:
  contract-audit run ./inputs
  contract-audit run ./inputs --variant on-site --out-dir ./reviewed
  contract-audit run 记录表.xlsx 放款明细.xlsx 字段表.xlsx 二次明细.xlsx 重卡数据.csv --json
  contract-audit run ./inputs --config audit.toml --output result.json --no-export")]
    Run {
        /// Input files, or directories to search one level deep
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// TOML config file (defaults to the built-in preset)
        #[arg(long, env = "CONTRACT_AUDIT_CONFIG")]
        config: Option<PathBuf>,

        /// Built-in preset to use when no config file is given
        #[arg(long, value_enum, conflicts_with = "config")]
        variant: Option<VariantArg>,

        /// Directory for annotated workbooks
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Which field-master workbooks to write
        #[arg(long, value_enum, default_value = "all")]
        missing_export: MissingExportArg,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip writing annotated workbooks
        #[arg(long)]
        no_export: bool,
    },

    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  contract-audit validate audit.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// Print a built-in preset as TOML
    #[command(after_help = "\
Examples:
  contract-audit show-config > audit.toml
  contract-audit show-config --variant on-site")]
    ShowConfig {
        #[arg(long, value_enum, default_value = "standard")]
        variant: VariantArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantArg {
    Standard,
    OnSite,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Standard => Variant::Standard,
            VariantArg::OnSite => Variant::OnSite,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MissingExportArg {
    /// Every field-master row with the annotation column
    All,
    /// Missing rows only
    Missing,
    Both,
}

impl From<MissingExportArg> for MissingExport {
    fn from(m: MissingExportArg) -> Self {
        match m {
            MissingExportArg::All => MissingExport::All,
            MissingExportArg::Missing => MissingExport::Missing,
            MissingExportArg::Both => MissingExport::Both,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        None => Err(CliError {
            code: EXIT_USAGE,
            message: "no command given".into(),
            hint: Some("contract-audit --help for more information".into()),
        }),
        Some(Commands::Run {
            inputs,
            config,
            variant,
            out_dir,
            missing_export,
            json,
            output,
            no_export,
        }) => audit::cmd_run(audit::RunArgs {
            inputs,
            config,
            variant: variant.map(Variant::from).unwrap_or_default(),
            out_dir,
            missing_export: missing_export.into(),
            json,
            output,
            no_export,
        }),
        Some(Commands::Validate { config }) => audit::cmd_validate(&config),
        Some(Commands::ShowConfig { variant }) => audit::cmd_show_config(variant.into()),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

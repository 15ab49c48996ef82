use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty sheet list, bad tolerance, etc.).
    ConfigValidation(String),
    /// No sheet name contains the keyword.
    SheetNotFound { keyword: String },
    /// A required column could not be resolved from its keyword.
    MissingColumn { table: String, keyword: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SheetNotFound { keyword } => {
                write!(f, "no sheet name contains keyword '{keyword}'")
            }
            Self::MissingColumn { table, keyword } => {
                write!(f, "table '{table}': no column matches keyword '{keyword}'")
            }
        }
    }
}

impl std::error::Error for ReconError {}

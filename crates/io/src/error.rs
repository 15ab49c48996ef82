use std::fmt;
use std::path::{Path, PathBuf};

use contract_audit_recon::ReferenceCategory;

#[derive(Debug, Clone, PartialEq)]
pub enum IoError {
    /// No input file name contains the keyword for this category.
    MissingInput { category: String, keyword: String },
    /// The file exists but could not be opened as a workbook.
    Open { path: PathBuf, message: String },
    /// No sheet in the file contains the keyword.
    SheetNotFound { path: PathBuf, keyword: String },
    Read { path: PathBuf, message: String },
    Write { path: PathBuf, message: String },
    /// Extension is not one of xlsx/xlsm/xls/xlsb/ods/csv.
    Unsupported { path: PathBuf },
}

impl IoError {
    pub(crate) fn missing_reference(category: ReferenceCategory, keyword: &str) -> Self {
        Self::MissingInput {
            category: category.to_string(),
            keyword: keyword.to_string(),
        }
    }

    pub(crate) fn open(path: &Path, err: impl fmt::Display) -> Self {
        Self::Open { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn read(path: &Path, err: impl fmt::Display) -> Self {
        Self::Read { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn write(path: &Path, err: impl fmt::Display) -> Self {
        Self::Write { path: path.to_path_buf(), message: err.to_string() }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput { category, keyword } => write!(
                f,
                "no input file for '{category}' (file name must contain '{keyword}')"
            ),
            Self::Open { path, message } => {
                write!(f, "cannot open {}: {message}", path.display())
            }
            Self::SheetNotFound { path, keyword } => write!(
                f,
                "{}: no sheet name contains keyword '{keyword}'",
                path.display()
            ),
            Self::Read { path, message } => {
                write!(f, "cannot read {}: {message}", path.display())
            }
            Self::Write { path, message } => {
                write!(f, "cannot write {}: {message}", path.display())
            }
            Self::Unsupported { path } => write!(
                f,
                "unsupported file type: {} (expected xlsx, xlsm, xls, xlsb, ods or csv)",
                path.display()
            ),
        }
    }
}

impl std::error::Error for IoError {}

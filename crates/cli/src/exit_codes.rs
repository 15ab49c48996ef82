//! CLI Exit Code Registry
//!
//! Single source of truth for `contract-audit` exit codes. Scripts rely on
//! them, so a code never changes meaning once released.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success, nothing to review                         |
//! | 1    | General error (unspecified)                        |
//! | 2    | Usage error (bad arguments)                        |
//! | 3    | Run completed with mismatches or missing records   |
//! | 4    | Config file invalid                                |
//! | 5    | Input file missing or unreadable                   |
//! | 6    | Annotated workbook or JSON could not be written    |

use contract_audit_io::IoError;

/// Success - run completed and nothing needs review.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Findings - at least one mismatch or missing record.
/// Like `diff(1)`, a non-zero code means "inputs differ".
pub const EXIT_FINDINGS: u8 = 3;

/// Config could not be read, parsed or validated.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// A required input could not be located, opened or read.
pub const EXIT_INPUT: u8 = 5;

/// Writing an output file failed.
pub const EXIT_EXPORT: u8 = 6;

/// Map an I/O-layer error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Write { .. } => EXIT_EXPORT,
        IoError::MissingInput { .. }
        | IoError::Open { .. }
        | IoError::SheetNotFound { .. }
        | IoError::Read { .. }
        | IoError::Unsupported { .. } => EXIT_INPUT,
    }
}

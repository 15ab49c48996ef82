//! `contract-audit-recon`: contract record reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded workbooks and reference tables,
//! returns per-sheet reports, a missing-record report and cell marks.
//! No CLI or IO dependencies.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod missing;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod reference;
pub mod resolve;

pub use config::{AuditConfig, Variant};
pub use engine::{run, AuditInput};
pub use error::ReconError;
pub use model::{
    AnnotationSink, AuditResult, CellMark, MarkKind, RawValue, ReferenceCategory, Table, TableRow,
    Workbook,
};
pub use reference::{ReferenceSet, ReferenceTable};

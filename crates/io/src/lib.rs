// File I/O: input discovery, Excel/CSV loading, annotated xlsx export

pub mod csv;
pub mod discover;
pub mod error;
pub mod export;
pub mod grid;
pub mod load;
pub mod xlsx;

pub use discover::{discover, FileKind, InputSet};
pub use error::IoError;
pub use export::{export_missing, export_primary_sheets, MissingExport};
pub use grid::Grid;
pub use load::{load_grid, load_grids, load_table, load_workbook, LoadedInputs};
pub use xlsx::SheetAnnotator;

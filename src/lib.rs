//! # xlsx2csv
//!
//! Converts Office Open XML (OOXML) SpreadsheetML workbooks (`.xlsx`) to
//! delimited text. The library owns the hard part — streaming the worksheet
//! XML, resolving every cell through the shared-string/style/relationship
//! tables, and rendering rows as CSV — behind a small surface:
//!
//! - [`Workbook::open_path`] / [`Workbook::open_bytes`] open a workbook from a
//!   local file or an in-memory buffer.
//! - [`Workbook::sheet_id_by_name`] resolves a sheet name to its 1-based index.
//! - [`Workbook::convert`] streams one sheet, or every matching sheet, to an
//!   [`OutputSink`].
//!
//! The `xlsx2csv` binary (`src/bin/xlsx2csv.rs`) is a thin CLI wired to this
//! library; it owns no conversion logic of its own.

mod config;
mod csv_sink;
mod decoder;
mod driver;
mod error;
mod helpers;
mod reference;
mod value;
mod workbook;

pub use config::{Config, LineTerminator, Quoting, SheetSelector};
pub use driver::{OutputSink, Workbook};
pub use error::XlsxCsvError;
pub use workbook::formats::FormatClass;

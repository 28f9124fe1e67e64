use thiserror::Error;

/// Main error type for the xlsx2csv crate.
/// Aggregates errors from standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum XlsxCsvError {
    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    PatternError(#[from] regex::Error),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Domain errors
    #[error("workbook '{0}' could not be opened: {1}")]
    InvalidWorkbook(String, String),

    #[error("workbook '{0}' is password protected")]
    PasswordProtected(String),

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("output path '{0}' already exists as a file")]
    OutFileExists(String),

    #[error("value error at {sheet}!{address}: {message}")]
    ValueError {
        sheet: String,
        address: String,
        message: String,
    },

    #[error("invalid option '{name}': {message}")]
    OptionError { name: String, message: String },
}

//! The conversion options bag: a flat record of explicit fields with sane
//! defaults, covering the full CLI surface (delimiters, quoting, date/time/
//! float formatting, sheet filters, hidden-row/sheet handling, and cell
//! enrichment).

use crate::workbook::formats::FormatClass;
use encoding_rs::Encoding;
use regex::Regex;
use std::collections::HashSet;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SheetSelector {
    /// 1-based sheet index; `0` means "all sheets".
    Index(usize),
    Name(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Quoting {
    None,
    Minimal,
    NonNumeric,
    All,
}

impl Default for Quoting {
    fn default() -> Self {
        Quoting::Minimal
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LineTerminator {
    Lf,
    Cr,
    CrLf,
}

impl Default for LineTerminator {
    fn default() -> Self {
        LineTerminator::Lf
    }
}

/// The full set of conversion options, built once by the CLI layer (or any
/// other caller) and passed by reference into the driver and sheet decoder.
#[derive(Clone, Debug)]
pub struct Config {
    pub delimiter: u8,
    pub line_terminator: LineTerminator,
    pub sheet_delimiter: String,
    pub quoting: Quoting,
    pub output_encoding: &'static Encoding,

    pub date_format: Option<String>,
    pub time_format: String,
    pub float_format: String,
    pub scifloat: bool,

    pub include_sheet_patterns: Vec<Regex>,
    pub exclude_sheet_patterns: Vec<Regex>,
    pub exclude_hidden_sheets: bool,

    pub skip_hidden_rows: bool,
    pub skip_empty_lines: bool,
    pub skip_trailing_columns: bool,

    pub escape: bool,
    pub no_line_breaks: bool,
    pub hyperlinks: bool,
    pub merge_cells: bool,
    pub ignore_formats: HashSet<FormatClass>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            delimiter: b',',
            line_terminator: LineTerminator::default(),
            sheet_delimiter: "--------".to_string(),
            quoting: Quoting::default(),
            output_encoding: encoding_rs::UTF_8,
            date_format: None,
            time_format: "%H:%M".to_string(),
            float_format: "%f".to_string(),
            scifloat: false,
            include_sheet_patterns: Vec::new(),
            exclude_sheet_patterns: Vec::new(),
            exclude_hidden_sheets: false,
            skip_hidden_rows: true,
            skip_empty_lines: false,
            skip_trailing_columns: false,
            escape: false,
            no_line_breaks: false,
            hyperlinks: false,
            merge_cells: false,
            ignore_formats: HashSet::new(),
        }
    }
}

impl Config {
    /// A sheet name matches the filter when (no include patterns, or any
    /// include pattern matches) and no exclude pattern matches (§4.9).
    pub(crate) fn sheet_name_matches(&self, name: &str) -> bool {
        let included = self.include_sheet_patterns.is_empty()
            || self.include_sheet_patterns.iter().any(|pattern| pattern.is_match(name));
        let excluded = self.exclude_sheet_patterns.iter().any(|pattern| pattern.is_match(name));
        included && !excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cli_defaults() {
        let config = Config::default();
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.quoting, Quoting::Minimal);
        assert_eq!(config.sheet_delimiter, "--------");
        assert_eq!(config.output_encoding, encoding_rs::UTF_8);
        assert!(config.skip_hidden_rows);
    }

    #[test]
    fn sheet_name_matches_honors_include_and_exclude() {
        let mut config = Config::default();
        config.include_sheet_patterns.push(Regex::new("^Data").unwrap());
        config.exclude_sheet_patterns.push(Regex::new("Archive$").unwrap());

        assert!(config.sheet_name_matches("Data2024"));
        assert!(!config.sheet_name_matches("DataArchive"));
        assert!(!config.sheet_name_matches("Summary"));
    }
}

//! Minimal CSV writer sink (§4.8): delimiter/quoting/line-terminator wrap
//! around the `csv` crate's writer, plus the sheet-delimiter header line used
//! when concatenating every sheet onto a single output stream (§4.9).

use crate::config::{Config, LineTerminator, Quoting};
use crate::error::XlsxCsvError;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::Write;

pub(crate) struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub(crate) fn new(sink: W, config: &Config) -> CsvSink<W> {
        let quote_style = match config.quoting {
            Quoting::None => QuoteStyle::Never,
            Quoting::Minimal => QuoteStyle::Necessary,
            Quoting::NonNumeric => QuoteStyle::NonNumeric,
            Quoting::All => QuoteStyle::Always,
        };
        let terminator = match config.line_terminator {
            LineTerminator::Lf => Terminator::Any(b'\n'),
            LineTerminator::Cr => Terminator::Any(b'\r'),
            LineTerminator::CrLf => Terminator::CRLF,
        };
        let writer = WriterBuilder::new()
            .delimiter(config.delimiter)
            .quote_style(quote_style)
            .terminator(terminator)
            .flexible(true)
            .from_writer(sink);
        CsvSink { writer }
    }

    pub(crate) fn write_row(&mut self, row: &[String]) -> Result<(), XlsxCsvError> {
        self.writer.write_record(row)?;
        Ok(())
    }

    /// Writes the `sheetdelimiter` header line that separates sheets when
    /// every selected sheet is concatenated onto one output stream (§4.9).
    pub(crate) fn write_sheet_header(&mut self, config: &Config, index: usize, name: &str) -> Result<(), XlsxCsvError> {
        self.writer.flush()?;
        let line = format!("{}{}:{}\n", config.sheet_delimiter, index, name);
        self.writer.get_mut().write_all(line.as_bytes())?;
        Ok(())
    }

    pub(crate) fn into_inner(self) -> Result<W, XlsxCsvError> {
        self.writer.into_inner().map_err(|error| XlsxCsvError::IoError(error.into_error()))
    }
}

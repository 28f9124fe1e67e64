//! The Xlsx driver (§4.9): opens the archive once, loads the workbook-wide
//! cross-reference tables, and orchestrates per-sheet decoding to a CSV sink.
//! One type owns the opened container and exposes a small "open once, decode
//! per sheet" surface, plus a sheet-selection/filter layer (name, index, or
//! every matching sheet) above it.

use crate::config::{Config, SheetSelector};
use crate::csv_sink::CsvSink;
use crate::decoder::{self, SheetContext};
use crate::error::XlsxCsvError;
use crate::helpers::encoding::wrap_output;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::zip::ZipHelper;
use crate::workbook::content_types::ContentTypesIndex;
use crate::workbook::manifest::{SheetState, WorkbookManifest};
use crate::workbook::relationships::{sibling_rels_path, Relationships};
use crate::workbook::shared_strings::SharedStrings;
use crate::workbook::styles::Styles;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Where a conversion's CSV output goes. A single sheet always writes to a
/// `Writer`; the all-sheets case (`SheetSelector::Index(0)`) accepts either
/// variant (§4.9).
pub enum OutputSink {
    Writer(Box<dyn Write>),
    Directory(PathBuf),
}

/// Magic bytes of an OLE/CFB compound file — the container Excel uses to
/// wrap a password-protected (`EncryptedPackage`) workbook. A `.xlsx` that
/// starts with this is not a malformed ZIP, it is an encrypted one.
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// The opened workbook: the archive handle plus every cross-reference table
/// built once at construction (§3, Lifecycles) and held immutable thereafter.
pub struct Workbook<RS: Read + Seek> {
    zip: ZipArchive<RS>,
    content_types: ContentTypesIndex,
    manifest: WorkbookManifest,
    styles: Styles,
    shared_strings: SharedStrings,
    source_name: String,
}

impl Workbook<UnifiedReader> {
    /// Opens a workbook from a local file path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Workbook<UnifiedReader>, XlsxCsvError> {
        let path = path.as_ref();
        let reader = UnifiedReader::from_path(&path.to_string_lossy())
            .map_err(|error| XlsxCsvError::InvalidWorkbook(path.to_string_lossy().to_string(), error.to_string()))?;
        Workbook::open(reader, path.to_string_lossy().to_string())
    }

    /// Opens a workbook from an in-memory byte buffer the caller already holds.
    pub fn open_bytes(bytes: Vec<u8>) -> Result<Workbook<UnifiedReader>, XlsxCsvError> {
        let first_bytes = bytes.get(..8).map(|slice| slice.to_vec());
        let reader = UnifiedReader::from_bytes(bytes);
        Workbook::open_checked(reader, "<bytes>".to_string(), first_bytes)
    }
}

impl<RS: Read + Seek> Workbook<RS> {
    fn open(reader: RS, name: String) -> Result<Workbook<RS>, XlsxCsvError> {
        Workbook::open_checked(reader, name, None)
    }

    fn open_checked(mut reader: RS, name: String, sniffed: Option<Vec<u8>>) -> Result<Workbook<RS>, XlsxCsvError> {
        let magic = match sniffed {
            Some(bytes) => Some(bytes),
            None => {
                let mut head = [0u8; 8];
                let read = reader.read(&mut head).unwrap_or(0);
                let _ = reader.seek(std::io::SeekFrom::Start(0));
                Some(head[..read].to_vec())
            }
        };
        if magic.as_deref().map(|head| head.starts_with(&CFB_MAGIC)).unwrap_or(false) {
            return Err(XlsxCsvError::PasswordProtected(name));
        }

        let mut zip = ZipArchive::new(reader).map_err(|error| XlsxCsvError::InvalidWorkbook(name.clone(), error.to_string()))?;
        let content_types = ContentTypesIndex::from_zip(&mut zip)?;
        let manifest = WorkbookManifest::from_zip(&mut zip, &content_types)?;
        let styles = Styles::from_zip(&mut zip)?;
        let shared_strings = SharedStrings::from_zip(&mut zip)?;

        Ok(Workbook {
            zip,
            content_types,
            manifest,
            styles,
            shared_strings,
            source_name: name,
        })
    }

    /// Resolves a sheet name to its 1-based index (§6 library entry points).
    pub fn sheet_id_by_name(&self, name: &str) -> Option<usize> {
        self.manifest.sheet_id_by_name(name)
    }

    /// Sheet names in declaration order, for CLI listing / diagnostics.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.manifest.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    fn sheet_context(&self) -> SheetContext<'_> {
        SheetContext {
            shared_strings: &self.shared_strings,
            styles: &self.styles,
            date1904: self.manifest.date1904,
        }
    }

    /// Streams sheet `index`'s rows to `writer` as CSV, per §4.7/§4.8.
    fn decode_to_writer(&mut self, index: usize, config: &Config, writer: Box<dyn Write>) -> Result<(), XlsxCsvError> {
        let sheet = self
            .manifest
            .sheet_by_index(index)
            .ok_or_else(|| XlsxCsvError::SheetNotFound(format!("#{index}")))?;
        let sheet_name = sheet.name.clone();

        let part_path = self
            .manifest
            .resolve_sheet_part(index, &mut self.zip, &self.content_types)?
            .ok_or_else(|| XlsxCsvError::SheetNotFound(sheet_name.clone()))?;

        let bytes = self
            .zip
            .bytes(&part_path)?
            .ok_or_else(|| XlsxCsvError::SheetNotFound(sheet_name.clone()))?;

        let relationships = if config.hyperlinks {
            Relationships::from_zip(&mut self.zip, &sibling_rels_path(&part_path))?
        } else {
            Relationships::empty()
        };

        let context = self.sheet_context();
        let mut sink = CsvSink::new(writer, config);
        decoder::decode_sheet(&bytes, &relationships, &context, config, &sheet_name, &mut sink)?;
        sink.into_inner()?;
        Ok(())
    }

    /// Sheets that survive the `--all` filters (§4.9): name pattern
    /// include/exclude, and optionally hidden-sheet exclusion.
    fn matching_sheets(&self, config: &Config) -> Vec<(usize, String)> {
        self.manifest
            .sheets
            .iter()
            .filter(|sheet| config.sheet_name_matches(&sheet.name))
            .filter(|sheet| !(config.exclude_hidden_sheets && sheet.state != SheetState::Visible))
            .map(|sheet| (sheet.index, sheet.name.clone()))
            .collect()
    }

    /// The library's main entry point (§6): resolves `selector`, then routes
    /// to a single-sheet or all-sheets conversion against `output`.
    pub fn convert(&mut self, output: OutputSink, selector: &SheetSelector, config: &Config) -> Result<(), XlsxCsvError> {
        match selector {
            SheetSelector::Name(name) => {
                let index = self
                    .sheet_id_by_name(name)
                    .ok_or_else(|| XlsxCsvError::SheetNotFound(name.clone()))?;
                self.convert_one(index, output, config)
            }
            SheetSelector::Index(0) => self.convert_all(output, config),
            SheetSelector::Index(index) => self.convert_one(*index, output, config),
        }
    }

    fn convert_one(&mut self, index: usize, output: OutputSink, config: &Config) -> Result<(), XlsxCsvError> {
        match output {
            OutputSink::Writer(writer) => self.decode_to_writer(index, config, wrap_output(writer, config.output_encoding)),
            OutputSink::Directory(dir) => {
                let sheet = self
                    .manifest
                    .sheet_by_index(index)
                    .ok_or_else(|| XlsxCsvError::SheetNotFound(format!("#{index}")))?;
                let path = sheet_output_path(&dir, &sheet.name.clone());
                let writer: Box<dyn Write> = Box::new(File::create(&path)?);
                self.decode_to_writer(index, config, wrap_output(writer, config.output_encoding))
            }
        }
    }

    fn convert_all(&mut self, output: OutputSink, config: &Config) -> Result<(), XlsxCsvError> {
        let sheets = self.matching_sheets(config);
        match output {
            OutputSink::Directory(dir) => {
                if dir.is_file() {
                    return Err(XlsxCsvError::OutFileExists(dir.to_string_lossy().to_string()));
                }
                std::fs::create_dir_all(&dir)?;
                for (index, name) in sheets {
                    let path = sheet_output_path(&dir, &name);
                    let writer: Box<dyn Write> = Box::new(File::create(&path)?);
                    self.decode_to_writer(index, config, wrap_output(writer, config.output_encoding))?;
                }
                Ok(())
            }
            OutputSink::Writer(writer) => {
                let mut writer = wrap_output(writer, config.output_encoding);
                for (index, name) in sheets {
                    let mut header_sink = CsvSink::new(&mut writer, config);
                    header_sink.write_sheet_header(config, index, &name)?;
                    self.decode_to_writer(index, config, Box::new(&mut writer))?;
                }
                Ok(())
            }
        }
    }
}

fn sheet_output_path(dir: &Path, sheet_name: &str) -> PathBuf {
    dir.join(format!("{sheet_name}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Cursor;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn build_workbook(sheets_xml: &[(&str, &str)], shared_strings: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buffer);
            let options = SimpleFileOptions::default();

            writer.start_file("[Content_Types].xml", options).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
                    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
                    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
                    <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedstrings+xml"/>
                    </Types>"#,
                )
                .unwrap();

            writer.start_file("xl/workbook.xml", options).unwrap();
            let sheet_entries: String = sheets_xml
                .iter()
                .enumerate()
                .map(|(i, (name, _))| format!(r#"<sheet name="{name}" sheetId="{}" r:id="rId{}"/>"#, i + 1, i + 1))
                .collect();
            writer
                .write_all(
                    format!(
                        r#"<?xml version="1.0"?><workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_entries}</sheets></workbook>"#
                    )
                    .as_bytes(),
                )
                .unwrap();

            writer.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            let rel_entries: String = sheets_xml
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    format!(
                        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                        i + 1,
                        i + 1
                    )
                })
                .collect();
            writer
                .write_all(
                    format!(
                        r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rel_entries}</Relationships>"#
                    )
                    .as_bytes(),
                )
                .unwrap();

            writer.start_file("xl/styles.xml", options).unwrap();
            writer
                .write_all(br#"<?xml version="1.0"?><styleSheet><cellXfs><xf numFmtId="0"/></cellXfs></styleSheet>"#)
                .unwrap();

            writer.start_file("xl/sharedStrings.xml", options).unwrap();
            writer.write_all(shared_strings.as_bytes()).unwrap();

            for (i, (_, xml)) in sheets_xml.iter().enumerate() {
                writer.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options).unwrap();
                writer.write_all(xml.as_bytes()).unwrap();
            }

            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn sheet_id_by_name_resolves_declared_sheets() {
        let bytes = build_workbook(
            &[("Sheet1", r#"<worksheet><sheetData/></worksheet>"#)],
            r#"<?xml version="1.0"?><sst></sst>"#,
        );
        let workbook = Workbook::open_bytes(bytes).unwrap();
        assert_eq!(workbook.sheet_id_by_name("Sheet1"), Some(1));
        assert_eq!(workbook.sheet_id_by_name("Missing"), None);
    }

    #[test]
    fn convert_single_sheet_streams_csv() {
        let bytes = build_workbook(
            &[("Sheet1", r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#)],
            r#"<?xml version="1.0"?><sst><si><t>hello</t></si></sst>"#,
        );
        let mut workbook = Workbook::open_bytes(bytes).unwrap();
        let config = Config::default();
        let mut out = Vec::new();
        workbook
            .convert(OutputSink::Writer(Box::new(&mut out)), &SheetSelector::Index(1), &config)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hello\n");
    }

    #[test]
    fn convert_all_concatenates_with_sheet_headers() {
        let bytes = build_workbook(
            &[
                ("Sheet1", r#"<worksheet><sheetData><row r="1"><c r="A1" t="str"><v>a</v></c></row></sheetData></worksheet>"#),
                ("Sheet2", r#"<worksheet><sheetData><row r="1"><c r="A1" t="str"><v>b</v></c></row></sheetData></worksheet>"#),
            ],
            r#"<?xml version="1.0"?><sst></sst>"#,
        );
        let mut workbook = Workbook::open_bytes(bytes).unwrap();
        let config = Config::default();
        let mut out = Vec::new();
        workbook
            .convert(OutputSink::Writer(Box::new(&mut out)), &SheetSelector::Index(0), &config)
            .unwrap();
        let output = String::from_utf8(out).unwrap();
        assert_eq!(output, "--------1:Sheet1\na\n--------2:Sheet2\nb\n");
    }

    #[test]
    fn sheet_not_found_is_reported() {
        let bytes = build_workbook(
            &[("Sheet1", r#"<worksheet><sheetData/></worksheet>"#)],
            r#"<?xml version="1.0"?><sst></sst>"#,
        );
        let mut workbook = Workbook::open_bytes(bytes).unwrap();
        let config = Config::default();
        let mut out = Vec::new();
        let error = workbook
            .convert(OutputSink::Writer(Box::new(&mut out)), &SheetSelector::Name("Nope".to_string()), &config)
            .unwrap_err();
        assert!(matches!(error, XlsxCsvError::SheetNotFound(_)));
    }

    #[test]
    fn outputencoding_transcodes_the_csv_stream() {
        let bytes = build_workbook(
            &[("Sheet1", r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#)],
            r#"<?xml version="1.0"?><sst><si><t>caf&#233;</t></si></sst>"#,
        );
        let mut workbook = Workbook::open_bytes(bytes).unwrap();
        let mut config = Config::default();
        config.output_encoding = encoding_rs::WINDOWS_1252;
        let mut out = Vec::new();
        workbook
            .convert(OutputSink::Writer(Box::new(&mut out)), &SheetSelector::Index(1), &config)
            .unwrap();
        assert_eq!(out, vec![b'c', b'a', b'f', 0xE9, b'\n']);
    }

    #[test]
    fn all_sheets_mode_rejects_a_directory_target_that_is_an_existing_file() {
        let bytes = build_workbook(
            &[("Sheet1", r#"<worksheet><sheetData/></worksheet>"#)],
            r#"<?xml version="1.0"?><sst></sst>"#,
        );
        let mut workbook = Workbook::open_bytes(bytes).unwrap();
        let config = Config::default();
        let file = tempfile::NamedTempFile::new().unwrap();

        let error = workbook
            .convert(OutputSink::Directory(file.path().to_path_buf()), &SheetSelector::Index(0), &config)
            .unwrap_err();
        assert!(matches!(error, XlsxCsvError::OutFileExists(_)));
    }
}

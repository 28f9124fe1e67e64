//! Parses `xl/styles.xml`: custom `numFmts` and the `cellXfs` style index,
//! producing a style-index → format-string lookup. Keeps the format *string*
//! rather than immediately folding it into a cell-type enum, so the sheet
//! decoder can apply the format table and fallback heuristic from
//! `workbook::formats` uniformly.

use crate::error::XlsxCsvError;
use crate::helpers::xml::{XmlEndTagHelper, XmlNodeHelper};
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::workbook::formats::standard_format;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{BufRead, Read, Seek};
use zip::ZipArchive;

pub(crate) struct Styles {
    /// custom format id -> lowercase format code, backslashes stripped
    num_fmts: HashMap<u32, String>,
    /// cell style index -> numFmtId (absent when a `<xf>` carries none)
    cell_xfs: Vec<Option<u32>>,
}

impl Styles {
    pub(crate) fn empty() -> Styles {
        Styles {
            num_fmts: HashMap::new(),
            cell_xfs: Vec::new(),
        }
    }

    pub(crate) fn parse<R: BufRead>(reader: &mut crate::helpers::xml::XmlReader<R>) -> Result<Styles, XlsxCsvError> {
        let mut num_fmts = HashMap::new();
        let mut cell_xfs = Vec::new();
        let mut in_custom_formats = false;
        let mut in_format_indexes = false;

        match_xml_events!(reader => {
            Event::Start(event) if event.local_tag() == "numFmts" => {
                in_custom_formats = true;
            }
            Event::End(event) if event.local_tag() == "numFmts" => {
                in_custom_formats = false;
            }
            Event::Start(event) if in_custom_formats && event.local_tag() == "numFmt" => {
                let id = event.get_attribute_value("numFmtId")?;
                let format = event.get_attribute_value("formatCode")?;
                if let Some((id, format)) = id.zip(format) {
                    if let Ok(id) = id.parse::<u32>() {
                        num_fmts.insert(id, lowercase_strip_backslashes(&format));
                    }
                }
            }
            Event::Start(event) if event.local_tag() == "cellXfs" => {
                in_format_indexes = true;
            }
            Event::End(event) if event.local_tag() == "cellXfs" => {
                in_format_indexes = false;
            }
            Event::Start(event) if in_format_indexes && event.local_tag() == "xf" => {
                let num_fmt_id = event.get_attribute_value("numFmtId")?
                    .and_then(|value| value.parse::<u32>().ok())
                    .or_else(|| {
                        event.get_attribute_value("applyNumberFormat").ok().flatten()
                            .and_then(|value| value.parse::<u32>().ok())
                    });
                cell_xfs.push(num_fmt_id);
            }
        });

        Ok(Styles { num_fmts, cell_xfs })
    }

    pub(crate) fn from_zip<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Styles, XlsxCsvError> {
        match zip.xml_reader("xl/styles.xml")? {
            Some(mut reader) => Styles::parse(&mut reader),
            None => Ok(Styles::empty()),
        }
    }

    /// Resolves a cell's `s` attribute to a format string, per §3/§4.6.
    /// An out-of-range style index is treated as "no style" (returns `None`).
    pub(crate) fn format_for_style(&self, style_index: usize) -> Option<&str> {
        let num_fmt_id = *self.cell_xfs.get(style_index)?;
        let num_fmt_id = num_fmt_id?;
        self.num_fmts
            .get(&num_fmt_id)
            .map(String::as_str)
            .or_else(|| standard_format(num_fmt_id))
    }
}

fn lowercase_strip_backslashes(format: &str) -> String {
    format.chars().filter(|c| *c != '\\').collect::<String>().to_ascii_lowercase()
}

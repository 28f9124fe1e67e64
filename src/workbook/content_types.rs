//! Parses `[Content_Types].xml`: maps logical roles to part paths (§4.2).
//!
//! Built on the same `match_xml_events!` SAX idiom as the rest of the
//! workbook loaders, for consistency.

use crate::error::XlsxCsvError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::io::{BufRead, Read, Seek};
use zip::ZipArchive;

const WORKBOOK_CONTENT_TYPE: &str = "spreadsheetml.sheet.main";
const STYLES_CONTENT_TYPE: &str = "spreadsheetml.styles";
const SHARED_STRINGS_CONTENT_TYPE: &str = "spreadsheetml.sharedstrings";
const WORKSHEET_CONTENT_TYPE: &str = "spreadsheetml.worksheet";

#[derive(Debug, Default)]
pub(crate) struct ContentTypesIndex {
    workbook: Option<String>,
    styles: Option<String>,
    shared_strings: Option<String>,
    /// Documented imperfection (§4.2): only the last worksheet part seen is kept.
    worksheet: Option<String>,
}

impl ContentTypesIndex {
    pub(crate) fn from_zip<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<ContentTypesIndex, XlsxCsvError> {
        let mut reader = match zip.xml_reader("[Content_Types].xml")? {
            Some(reader) => reader,
            None => return Ok(ContentTypesIndex::default()),
        };
        let mut index = ContentTypesIndex::default();
        match_xml_events!(reader => {
            Event::Start(event) | Event::Empty(event) if event.local_tag() == "Override" => {
                let content_type = event.get_attribute_value("ContentType")?.map(|v| v.to_ascii_lowercase());
                let part_name = event.get_attribute_value("PartName")?;
                if let (Some(content_type), Some(part_name)) = (content_type, part_name) {
                    let part_name = part_name.trim_start_matches('/').to_string();
                    if content_type.contains(WORKBOOK_CONTENT_TYPE) {
                        index.workbook.get_or_insert(part_name.clone());
                    } else if content_type.contains(STYLES_CONTENT_TYPE) {
                        index.styles.get_or_insert(part_name.clone());
                    } else if content_type.contains(SHARED_STRINGS_CONTENT_TYPE) {
                        index.shared_strings.get_or_insert(part_name.clone());
                    } else if content_type.contains(WORKSHEET_CONTENT_TYPE) {
                        index.worksheet = Some(part_name);
                    }
                }
            }
        });
        Ok(index)
    }

    pub(crate) fn workbook_path(&self) -> String {
        self.workbook.clone().unwrap_or_else(|| "xl/workbook.xml".to_string())
    }

    pub(crate) fn worksheet_path(&self) -> Option<&str> {
        self.worksheet.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_workbook_path_when_missing() {
        let index = ContentTypesIndex::default();
        assert_eq!(index.workbook_path(), "xl/workbook.xml");
    }
}

//! Parses `xl/workbook.xml`: the ordered sheet list and the `date1904` flag (§4.4).
//! Keeps each sheet's relation id and visibility state alongside its name, so
//! later sheet-selection filtering (by name, index, or hidden state) has
//! everything it needs without a second pass.

use crate::error::XlsxCsvError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper as _;
use crate::match_xml_events;
use crate::workbook::content_types::ContentTypesIndex;
use crate::workbook::relationships::{normalize_target, sibling_rels_path, Relationships};
use quick_xml::events::Event;
use std::io::{Read, Seek};
use zip::ZipArchive;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SheetState {
    Visible,
    Hidden,
    VeryHidden,
}

#[derive(Clone, Debug)]
pub(crate) struct SheetEntry {
    pub(crate) name: String,
    /// 1-based declaration order.
    pub(crate) index: usize,
    pub(crate) relation_id: Option<String>,
    pub(crate) state: SheetState,
}

pub(crate) struct WorkbookManifest {
    pub(crate) sheets: Vec<SheetEntry>,
    pub(crate) date1904: bool,
    pub(crate) relationships: Relationships,
}

impl WorkbookManifest {
    pub(crate) fn from_zip<RS: Read + Seek>(
        zip: &mut ZipArchive<RS>,
        content_types: &ContentTypesIndex,
    ) -> Result<WorkbookManifest, XlsxCsvError> {
        let workbook_path = content_types.workbook_path();
        let relationships = Relationships::from_zip(zip, &sibling_rels_path(&workbook_path))?;

        let mut reader = zip
            .xml_reader(&workbook_path)?
            .ok_or_else(|| XlsxCsvError::InvalidWorkbook(workbook_path.clone(), "missing workbook part".to_string()))?;

        let mut sheets = Vec::new();
        let mut date1904 = false;
        let mut next_index = 1usize;

        match_xml_events!(reader => {
            Event::Start(event) if event.local_tag() == "workbookPr" => {
                date1904 = event.get_attribute_value("date1904")?
                    .map(|value| !value.eq_ignore_ascii_case("false"))
                    .unwrap_or(false);
            }
            Event::Start(event) if event.local_tag() == "sheet" => {
                let name = event.get_attribute_value("name")?.map(|v| v.to_string());
                let relation_id = event.get_attribute_value("r:id")?
                    .or(event.get_attribute_value("id")?)
                    .map(|v| v.to_string());
                let state = match event.get_attribute_value("state")?.as_deref() {
                    Some("hidden") => SheetState::Hidden,
                    Some("veryHidden") => SheetState::VeryHidden,
                    _ => SheetState::Visible,
                };
                if let Some(name) = name {
                    sheets.push(SheetEntry {
                        name,
                        index: next_index,
                        relation_id,
                        state,
                    });
                    next_index += 1;
                }
            }
        });

        Ok(WorkbookManifest { sheets, date1904, relationships })
    }

    pub(crate) fn sheet_id_by_name(&self, name: &str) -> Option<usize> {
        self.sheets.iter().find(|sheet| sheet.name == name).map(|sheet| sheet.index)
    }

    pub(crate) fn sheet_by_index(&self, index: usize) -> Option<&SheetEntry> {
        self.sheets.iter().find(|sheet| sheet.index == index)
    }

    /// Resolves sheet *i*'s worksheet part path, per the ordered fallback in §4.4.
    /// Each fallback candidate is only accepted if it actually exists in `zip`.
    pub(crate) fn resolve_sheet_part<RS: Read + Seek>(
        &self,
        index: usize,
        zip: &mut ZipArchive<RS>,
        content_types: &ContentTypesIndex,
    ) -> Result<Option<String>, XlsxCsvError> {
        let Some(sheet) = self.sheet_by_index(index) else {
            return Ok(None);
        };

        if let Some(relation_id) = &sheet.relation_id {
            if let Some(relationship) = self.relationships.get(relation_id) {
                let target = normalize_target(&relationship.target);
                if zip.file(&target)?.is_some() {
                    return Ok(Some(target));
                }
            }
        }

        for candidate in [
            format!("xl/worksheets/sheet{index}.xml"),
            format!("xl/worksheets/worksheet{index}.xml"),
        ] {
            if zip.file(&candidate)?.is_some() {
                return Ok(Some(candidate));
            }
        }

        if index == 1 {
            if let Some(path) = content_types.worksheet_path() {
                if zip.file(path)?.is_some() {
                    return Ok(Some(path.to_string()));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_state_defaults_to_visible() {
        assert_eq!(SheetState::Visible, SheetState::Visible);
    }
}

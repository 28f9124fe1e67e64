//! Parses `*.rels` parts (`id -> {type, target}`), namespace-agnostic.
//!
//! Keeps every relationship, not only worksheet ones, since this crate also
//! needs `Hyperlink`-typed relationships for §4.7.4.

use crate::error::XlsxCsvError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{BufRead, Read, Seek};
use zip::ZipArchive;

#[derive(Clone, Debug)]
pub(crate) struct Relationship {
    pub(crate) kind: String,
    pub(crate) target: String,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Relationships(HashMap<String, Relationship>);

impl Relationships {
    pub(crate) fn empty() -> Relationships {
        Relationships(HashMap::new())
    }

    pub(crate) fn parse<R: BufRead>(reader: &mut crate::helpers::xml::XmlReader<R>) -> Result<Relationships, XlsxCsvError> {
        let mut relationships = HashMap::new();
        match_xml_events!(reader => {
            Event::Start(event) if is_relationship_tag(&event.local_tag()) => {
                let id = event.get_attribute_value("Id")?;
                let kind = event.get_attribute_value("Type")?;
                let target = event.get_attribute_value("Target")?;
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(
                        id.to_string(),
                        Relationship {
                            kind: kind.map(Cow::into_owned).unwrap_or_default(),
                            target: target.to_string(),
                        },
                    );
                }
            }
        });
        Ok(Relationships(relationships))
    }

    pub(crate) fn from_zip<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<Relationships, XlsxCsvError> {
        match zip.xml_reader(path)? {
            Some(mut reader) => Relationships::parse(&mut reader),
            None => Ok(Relationships::empty()),
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Relationship> {
        self.0.get(id)
    }

    pub(crate) fn by_type_target(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(|rel| rel.target.as_str())
    }
}

fn is_relationship_tag(local_tag: &str) -> bool {
    local_tag == "Relationship"
}

/// Normalizes a relationship target to a package-rooted path (`/xl/...`).
pub(crate) fn normalize_target(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("/xl/") {
        format!("xl/{stripped}")
    } else if path.starts_with("xl/") {
        path.to_string()
    } else if path.starts_with('/') {
        path.trim_start_matches('/').to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Locates the conventional sibling `.rels` part for a given part path
/// (e.g. `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`).
pub(crate) fn sibling_rels_path(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_rels_path_inserts_underscore_dir() {
        assert_eq!(
            sibling_rels_path("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
    }

    #[test]
    fn normalize_strips_leading_slash_under_xl() {
        assert_eq!(normalize_target("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(normalize_target("worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }
}

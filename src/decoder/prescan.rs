//! Hyperlink and merge-cell pre-scans (§4.7.4, §4.7.5): a first pass over the
//! already-buffered worksheet bytes that builds small `(row, column) -> ...`
//! maps the main streaming pass consults at row-end. Both are opt-in (the
//! worksheet is only ever buffered once either way, per §9's two-pass note).
//!
//! Both reuse the same `match_xml_events!` shape as the rest of the workbook
//! loaders, just over a second `XmlReader` on the same already-buffered bytes.

use crate::error::XlsxCsvError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::match_xml_events;
use crate::reference::{expand_range, parse_reference};
use crate::workbook::relationships::Relationships;
use quick_xml::events::Event;
use std::collections::{HashMap, HashSet};

/// address -> absolute hyperlink target, for every cell covered by a
/// `<hyperlink ref="...">`'s range.
pub(crate) fn scan_hyperlinks(
    bytes: &[u8],
    relationships: &Relationships,
) -> Result<HashMap<(usize, usize), String>, XlsxCsvError> {
    let mut reader = XmlReader::new(bytes);
    let mut links = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_tag() == "hyperlink" => {
            let reference = event.get_attribute_value("ref")?;
            let relation_id = event.get_attribute_value("r:id")?
                .or(event.get_attribute_value("id")?);
            if let (Some(reference), Some(relation_id)) = (reference, relation_id) {
                if let Some(target) = relationships.by_type_target(&relation_id) {
                    for address in expand_range(&reference) {
                        if let Some(coordinates) = parse_reference(&address) {
                            links.insert(coordinates, target.to_string());
                        }
                    }
                }
            }
        }
    });
    Ok(links)
}

/// A merge range's non-anchor members (`member -> anchor`), plus the set of
/// every anchor coordinate so the main pass knows which finalized cell
/// values to retain.
pub(crate) struct MergeMap {
    pub(crate) members: HashMap<(usize, usize), (usize, usize)>,
    pub(crate) anchors: HashSet<(usize, usize)>,
}

pub(crate) fn scan_merge_cells(bytes: &[u8]) -> Result<MergeMap, XlsxCsvError> {
    let mut reader = XmlReader::new(bytes);
    let mut members = HashMap::new();
    let mut anchors = HashSet::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_tag() == "mergeCell" => {
            let Some(reference) = event.get_attribute_value("ref")? else { continue };
            let addresses = expand_range(&reference);
            let Some(anchor_address) = addresses.first() else { continue };
            let Some(anchor) = parse_reference(anchor_address) else { continue };
            anchors.insert(anchor);
            for address in &addresses[1..] {
                if let Some(coordinates) = parse_reference(address) {
                    members.insert(coordinates, anchor);
                }
            }
        }
    });
    Ok(MergeMap { members, anchors })
}

//! Loads `xl/sharedStrings.xml` into an ordered pool, with the escape /
//! no-line-breaks post-processing options (§4.5). The full pool is loaded up
//! front, since every column of every row is streamed regardless.

use crate::error::XlsxCsvError;
use crate::helpers::xml::{XmlEndTagHelper, XmlNodeHelper, XmlTextContextHelper};
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::io::{BufRead, Read, Seek};
use zip::ZipArchive;

pub(crate) struct SharedStrings {
    pool: Vec<String>,
}

impl SharedStrings {
    pub(crate) fn empty() -> SharedStrings {
        SharedStrings { pool: Vec::new() }
    }

    #[cfg(test)]
    pub(crate) fn from_pool(pool: Vec<String>) -> SharedStrings {
        SharedStrings { pool }
    }

    pub(crate) fn from_zip<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<SharedStrings, XlsxCsvError> {
        let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(SharedStrings::empty()),
        };

        let mut pool = Vec::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.local_tag() == "si" => {
                pool.push(read_si_text(&mut reader)?);
            }
        });
        Ok(SharedStrings { pool })
    }

    /// Looks up a pool entry by index, applying the escape / no-line-breaks
    /// transforms. A missing index is a fatal value error (§7, Invariants).
    pub(crate) fn get(&self, index: usize, escape: bool, no_line_breaks: bool) -> Option<String> {
        self.pool.get(index).map(|text| transform(text, escape, no_line_breaks))
    }
}

fn transform(text: &str, escape: bool, no_line_breaks: bool) -> String {
    if no_line_breaks {
        text.chars()
            .map(|c| match c {
                '\r' | '\n' | '\t' => ' ',
                other => other,
            })
            .collect()
    } else if escape {
        text.replace('\r', r"\r").replace('\n', r"\n").replace('\t', r"\t")
    } else {
        text.to_string()
    }
}

fn read_si_text<R: BufRead>(reader: &mut crate::helpers::xml::XmlReader<R>) -> Result<String, XlsxCsvError> {
    let mut is_phonetic_text = false;
    let mut is_text = false;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_tag() == "si" => break,
        Event::Start(event) if event.local_tag() == "rPh" => is_phonetic_text = true,
        Event::End(event) if event.local_tag() == "rPh" => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_tag() == "t" => is_text = true,
        Event::End(event) if is_text && event.local_tag() == "t" => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_replaces_control_chars_with_literal_sequences() {
        assert_eq!(transform("a\nb\tc", true, false), r"a\nb\tc");
    }

    #[test]
    fn no_line_breaks_wins_over_escape() {
        assert_eq!(transform("a\nb", true, true), "a b");
    }

    #[test]
    fn default_passes_text_through() {
        assert_eq!(transform("a\nb", false, false), "a\nb");
    }
}

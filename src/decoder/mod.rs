//! Streaming worksheet decoder (§4.7) — the heart of the conversion. Reads a
//! single worksheet part's already-buffered bytes with a flat SAX loop over
//! nested `row`/`c`/`v`/`is`/`t` state, densifies each row, and writes it to
//! the CSV sink.
//!
//! Uses a flat `match_xml_events!` loop with mutable `row`/`col`/`kind`/`value`
//! locals rather than a recursive descent, since the worksheet schema nests
//! only a few levels deep and a flat dispatch keeps each branch small.

mod prescan;

use crate::config::Config;
use crate::error::XlsxCsvError;
use crate::helpers::xml::{XmlEndTagHelper, XmlNodeHelper, XmlReader, XmlTextContextHelper};
use crate::match_xml_events;
use crate::reference::{format_reference, parse_reference};
use crate::value::{self, CellValue};
use crate::workbook::formats::FormatClass;
use crate::workbook::relationships::Relationships;
use crate::workbook::shared_strings::SharedStrings;
use crate::workbook::styles::Styles;
use crate::csv_sink::CsvSink;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::io::Write;

/// The workbook-wide tables a sheet decode needs: loaded once by the driver
/// and borrowed for every sheet.
pub(crate) struct SheetContext<'a> {
    pub(crate) shared_strings: &'a SharedStrings,
    pub(crate) styles: &'a Styles,
    pub(crate) date1904: bool,
}

fn parse_serial(raw: &str, sheet: &str, address: &str) -> Result<f64, XlsxCsvError> {
    raw.trim().parse::<f64>().map_err(|_| XlsxCsvError::ValueError {
        sheet: sheet.to_string(),
        address: address.to_string(),
        message: format!("'{raw}' is not a valid numeric serial"),
    })
}

/// Resolves one cell's finalized text, per the §4.7.3 dispatch table.
fn resolve_cell(
    cell_type: Option<&str>,
    style_index: Option<usize>,
    raw: &str,
    ctx: &SheetContext,
    config: &Config,
    sheet: &str,
    address: &str,
) -> Result<String, XlsxCsvError> {
    match cell_type {
        Some("s") => {
            let index: usize = raw.trim().parse().map_err(|_| XlsxCsvError::ValueError {
                sheet: sheet.to_string(),
                address: address.to_string(),
                message: format!("'{raw}' is not a valid shared-string index"),
            })?;
            ctx.shared_strings
                .get(index, config.escape, config.no_line_breaks)
                .ok_or_else(|| XlsxCsvError::ValueError {
                    sheet: sheet.to_string(),
                    address: address.to_string(),
                    message: format!("shared string index {index} out of range"),
                })
        }
        Some("b") => Ok(match raw.trim().parse::<i64>() {
            Ok(1) => "TRUE".to_string(),
            Ok(0) => "FALSE".to_string(),
            _ => raw.to_string(),
        }),
        Some("str") | Some("inlineStr") => Ok(raw.to_string()),
        Some("n") => {
            let parsed = parse_serial(raw, sheet, address)?;
            value::render(
                CellValue::Number { value: parsed, scientific: value::looks_scientific(raw) },
                None,
                config,
                ctx.date1904,
                sheet,
                address,
            )
        }
        None => resolve_styled_cell(style_index, raw, ctx, config, sheet, address),
        // An explicit but unrecognized type (e.g. "e", a formula-error cell)
        // is not in the §4.7.3 dispatch table; style-driven classification
        // only applies when the attribute is absent, so emit raw verbatim.
        Some(_) => Ok(raw.to_string()),
    }
}

/// Style-driven classification for a cell with no `type` attribute (§4.7.3).
fn resolve_styled_cell(
    style_index: Option<usize>,
    raw: &str,
    ctx: &SheetContext,
    config: &Config,
    sheet: &str,
    address: &str,
) -> Result<String, XlsxCsvError> {
    let Some(format) = style_index.and_then(|index| ctx.styles.format_for_style(index)) else {
        return Ok(raw.to_string());
    };
    let Some(mut class) = value::format_class_for(format, raw.trim(), config.scifloat) else {
        return Ok(raw.to_string());
    };
    if class == FormatClass::Date && config.date_format.as_deref() == Some("float") {
        class = FormatClass::Float;
    }
    if config.ignore_formats.contains(&class) {
        return Ok(raw.to_string());
    }

    match class {
        FormatClass::Float | FormatClass::Percentage => {
            let parsed = parse_serial(raw, sheet, address)?;
            value::render(
                CellValue::Number { value: parsed, scientific: value::looks_scientific(raw) },
                Some(format),
                config,
                ctx.date1904,
                sheet,
                address,
            )
        }
        FormatClass::Date => {
            let parsed = parse_serial(raw, sheet, address)?;
            value::render(CellValue::DateSerial(parsed), Some(format), config, ctx.date1904, sheet, address)
        }
        FormatClass::Time => {
            let parsed = parse_serial(raw, sheet, address)?;
            value::render(CellValue::TimeSerial(parsed), Some(format), config, ctx.date1904, sheet, address)
        }
        FormatClass::String | FormatClass::Boolean => Ok(raw.to_string()),
    }
}

/// Streams one worksheet part's bytes to `sink`. `relationships` is the
/// worksheet's own sibling `.rels` (for hyperlink target resolution).
pub(crate) fn decode_sheet<W: Write>(
    bytes: &[u8],
    relationships: &Relationships,
    ctx: &SheetContext,
    config: &Config,
    sheet_name: &str,
    sink: &mut CsvSink<W>,
) -> Result<(), XlsxCsvError> {
    let hyperlinks = if config.hyperlinks {
        prescan::scan_hyperlinks(bytes, relationships)?
    } else {
        Default::default()
    };
    let merges = if config.merge_cells {
        prescan::scan_merge_cells(bytes)?
    } else {
        prescan::MergeMap { members: Default::default(), anchors: Default::default() }
    };
    let mut anchor_values: std::collections::HashMap<(usize, usize), String> = std::collections::HashMap::new();

    let mut reader = XmlReader::new(bytes);

    let mut dimension_width: Option<usize> = None;

    let mut row_num: usize = 0;
    let mut spans_end: Option<usize> = None;
    let mut skip_row = false;
    let mut row_accumulator: BTreeMap<usize, String> = BTreeMap::new();
    let mut col_counter: usize = 0;

    let mut cell_col: usize = 0;
    let mut cell_type: Option<String> = None;
    let mut cell_style: Option<usize> = None;

    let mut in_is = false;
    let mut in_value = false;
    let mut buffer = String::new();

    let mut last_emitted_row: usize = 0;
    let mut fixed_width: Option<usize> = None;

    match_xml_events!(reader => {
        Event::Start(event) if event.local_tag() == "dimension" => {
            if let Some(reference) = event.get_attribute_value("ref")? {
                let end = reference.split_once(':').map(|(_, end)| end).unwrap_or(reference.as_ref());
                if let Some((_, column)) = parse_reference(end) {
                    dimension_width = Some(column + 1);
                }
            }
        }
        Event::Start(event) if event.local_tag() == "row" => {
            row_num = event.parse_attribute_value::<usize>("r")?.unwrap_or(last_emitted_row + 1);
            let hidden = event.get_attribute_value("hidden")?.as_deref() == Some("1");
            skip_row = hidden && config.skip_hidden_rows;
            spans_end = event
                .get_attribute_value("spans")?
                .and_then(|spans| spans.rsplit(' ').next().map(str::to_string))
                .and_then(|last| last.rsplit_once(':').map(|(_, end)| end.to_string()))
                .and_then(|end| end.parse::<usize>().ok());
            row_accumulator.clear();
            col_counter = 0;
        }
        Event::Start(event) if event.local_tag() == "c" => {
            let reference = event.get_attribute_value("r")?;
            cell_col = reference
                .as_deref()
                .and_then(parse_reference)
                .map(|(_, column)| column)
                .unwrap_or(col_counter);
            col_counter = cell_col + 1;
            cell_type = event.get_attribute_value("t")?.map(|v| v.to_string());
            cell_style = event.parse_attribute_value::<usize>("s")?;
            buffer.clear();
            in_value = false;
            in_is = false;
        }
        Event::Start(event) if event.local_tag() == "is" => {
            in_is = true;
        }
        Event::End(event) if event.local_tag() == "is" => {
            in_is = false;
        }
        Event::Start(event) if event.local_tag() == "v" || (in_is && event.local_tag() == "t") => {
            in_value = true;
            buffer.clear();
        }
        Event::End(event) if event.local_tag() == "v" || (in_is && event.local_tag() == "t") => {
            in_value = false;
        }
        Event::Text(event) if in_value => buffer.push_str(&event.xml_content()?),
        Event::CData(event) if in_value => buffer.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if in_value => buffer.push_bytes_ref(&event)?,
        Event::End(event) if event.local_tag() == "c" => {
            let row0 = row_num.saturating_sub(1);
            let address = format_reference(row0, cell_col);
            let resolved = resolve_cell(
                cell_type.as_deref(),
                cell_style,
                &buffer,
                ctx,
                config,
                sheet_name,
                &address,
            )?;
            if config.merge_cells && merges.anchors.contains(&(row0, cell_col)) {
                anchor_values.insert((row0, cell_col), resolved.clone());
            }
            row_accumulator.insert(cell_col, resolved);
        }
        Event::End(event) if event.local_tag() == "row" => {
            finalize_row(
                row_num,
                &row_accumulator,
                spans_end,
                dimension_width,
                skip_row,
                &merges,
                &anchor_values,
                &hyperlinks,
                config,
                &mut last_emitted_row,
                &mut fixed_width,
                sink,
            )?;
        }
    });

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn finalize_row<W: Write>(
    row_num: usize,
    row_accumulator: &BTreeMap<usize, String>,
    spans_end: Option<usize>,
    dimension_width: Option<usize>,
    skip_row: bool,
    merges: &prescan::MergeMap,
    anchor_values: &std::collections::HashMap<(usize, usize), String>,
    hyperlinks: &std::collections::HashMap<(usize, usize), String>,
    config: &Config,
    last_emitted_row: &mut usize,
    fixed_width: &mut Option<usize>,
    sink: &mut CsvSink<W>,
) -> Result<(), XlsxCsvError> {
    if skip_row {
        *last_emitted_row = row_num;
        return Ok(());
    }

    if row_accumulator.is_empty() && config.skip_empty_lines {
        *last_emitted_row = row_num;
        return Ok(());
    }

    let row0 = row_num.saturating_sub(1);
    let mut width = row_accumulator.keys().next_back().map(|k| k + 1).unwrap_or(0);
    if let Some(spans_end) = spans_end {
        width = width.max(spans_end);
    }
    if let Some(dimension_width) = dimension_width {
        width = width.max(dimension_width);
    }
    if config.merge_cells {
        for &(mrow, mcol) in merges.members.keys() {
            if mrow == row0 {
                width = width.max(mcol + 1);
            }
        }
    }
    if config.hyperlinks {
        for &(hrow, hcol) in hyperlinks.keys() {
            if hrow == row0 {
                width = width.max(hcol + 1);
            }
        }
    }

    let mut dense = vec![String::new(); width];
    for (&column, value) in row_accumulator.iter() {
        dense[column] = value.clone();
    }

    if config.merge_cells {
        for (&(mrow, mcol), &anchor) in merges.members.iter() {
            if mrow == row0 {
                dense[mcol] = anchor_values.get(&anchor).cloned().unwrap_or_default();
            }
        }
    }

    if config.hyperlinks {
        for (&(hrow, hcol), url) in hyperlinks.iter() {
            if hrow == row0 {
                dense[hcol] = format!("<a href='{url}'>{}</a>", dense[hcol]);
            }
        }
    }

    if !config.skip_empty_lines {
        let gap = row_num.saturating_sub(*last_emitted_row + 1);
        for _ in 0..gap {
            sink.write_row(&[])?;
        }
    }
    *last_emitted_row = row_num;

    if config.skip_empty_lines && dense.iter().all(String::is_empty) {
        return Ok(());
    }

    if config.skip_trailing_columns {
        if fixed_width.is_none() && !dense.iter().all(String::is_empty) {
            let last_non_empty = dense.iter().rposition(|v| !v.is_empty());
            *fixed_width = Some(last_non_empty.map(|i| i + 1).unwrap_or(0));
        }
        if let Some(w) = *fixed_width {
            dense.resize(w, String::new());
        }
    }

    sink.write_row(&dense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::shared_strings::SharedStrings;
    use crate::workbook::styles::Styles;

    fn ctx<'a>(shared_strings: &'a SharedStrings, styles: &'a Styles, date1904: bool) -> SheetContext<'a> {
        SheetContext { shared_strings, styles, date1904 }
    }

    fn decode(xml: &[u8], config: &Config, date1904: bool) -> String {
        let shared_strings = SharedStrings::empty();
        let styles = Styles::empty();
        let context = ctx(&shared_strings, &styles, date1904);
        let relationships = Relationships::empty();
        let mut sink = CsvSink::new(Vec::new(), config);
        decode_sheet(xml, &relationships, &context, config, "Sheet1", &mut sink).unwrap();
        String::from_utf8(sink.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn scenario_a_shared_string() {
        let xml = br#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#;
        let config = Config::default();
        let shared_strings = SharedStrings::from_pool(vec!["hello".to_string()]);
        let styles = Styles::empty();
        let context = SheetContext { shared_strings: &shared_strings, styles: &styles, date1904: false };
        let relationships = Relationships::empty();
        let mut sink = CsvSink::new(Vec::new(), &config);
        decode_sheet(xml, &relationships, &context, &config, "Sheet1", &mut sink).unwrap();
        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn scenario_d_sparse_row_padded_by_dimension() {
        let xml = br#"<worksheet><dimension ref="A1:C1"/><sheetData><row r="1"><c r="B1" t="str"><v>x</v></c></row></sheetData></worksheet>"#;
        let output = decode(xml, &Config::default(), false);
        assert_eq!(output, ",x,\n");
    }

    #[test]
    fn boolean_cells_map_to_true_false_or_raw() {
        let xml = br#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="b"><v>1</v></c><c r="B1" t="b"><v>0</v></c></row>
        </sheetData></worksheet>"#;
        let output = decode(xml, &Config::default(), false);
        assert_eq!(output, "TRUE,FALSE\n");
    }

    #[test]
    fn gap_rows_are_emitted_when_skip_empty_lines_is_false() {
        let xml = br#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="str"><v>a</v></c></row>
            <row r="3"><c r="A1" t="str"><v>b</v></c></row>
        </sheetData></worksheet>"#;
        let output = decode(xml, &Config::default(), false);
        assert_eq!(output, "a\n\nb\n");
    }

    #[test]
    fn hidden_rows_are_skipped_by_default() {
        let xml = br#"<worksheet><sheetData>
            <row r="1" hidden="1"><c r="A1" t="str"><v>a</v></c></row>
            <row r="2"><c r="A1" t="str"><v>b</v></c></row>
        </sheetData></worksheet>"#;
        let output = decode(xml, &Config::default(), false);
        assert_eq!(output, "b\n");
    }
}

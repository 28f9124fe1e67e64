//! The cell value sum type and its date/time/float rendering rules (§4.7.3, §9).
//! A small tagged union plus pure `type -> value` conversion functions, kept
//! free of any XML/zip concerns so the sheet decoder can call straight
//! through to it from inside the SAX callbacks.

use crate::config::Config;
use crate::error::XlsxCsvError;
use crate::workbook::formats::FormatClass;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// The dynamically-typed value a resolved cell carries, prior to rendering.
#[derive(Clone, Debug)]
pub(crate) enum CellValue {
    /// Already fully resolved text: shared string, inline string, `str`-typed, or an
    /// unrecognized/unclassifiable cell emitted verbatim.
    Raw(String),
    Bool(bool),
    /// Serial day count to be interpreted as a date.
    DateSerial(f64),
    /// Fractional-day serial to be interpreted as a time-of-day.
    TimeSerial(f64),
    /// A plain numeric value, rendered per the float rules. `scientific`
    /// records whether the *raw* cell text used scientific notation (§4.7.3);
    /// that, not the value itself, selects the scientific-notation branch.
    Number { value: f64, scientific: bool },
}

/// Excel's epoch quirk (§3 Invariants, §9 GLOSSARY "Serial date/time"): the
/// 1899-12-30 base reproduces Excel's (buggy) 1900 leap-year day count for the
/// serial ranges real workbooks actually contain; the 1904 system has no such
/// bug and the base is the straightforward 1904-01-01.
fn date_epoch(date1904: bool) -> NaiveDate {
    if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1).expect("valid date")
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid date")
    }
}

pub(crate) fn render(
    value: CellValue,
    format: Option<&str>,
    config: &Config,
    date1904: bool,
    sheet: &str,
    address: &str,
) -> Result<String, XlsxCsvError> {
    let fail = |message: String| XlsxCsvError::ValueError {
        sheet: sheet.to_string(),
        address: address.to_string(),
        message,
    };
    match value {
        CellValue::Raw(text) => Ok(text),
        CellValue::Bool(value) => Ok(if value { "TRUE" } else { "FALSE" }.to_string()),
        CellValue::DateSerial(serial) => render_date(serial, format, config, date1904).map_err(fail),
        CellValue::TimeSerial(serial) => render_time(serial, config).map_err(fail),
        CellValue::Number { value, scientific } => Ok(render_float(value, scientific, format, config)),
    }
}

fn render_date(serial: f64, format: Option<&str>, config: &Config, date1904: bool) -> Result<String, String> {
    if !serial.is_finite() {
        return Err(format!("date serial '{serial}' is not finite"));
    }
    let days = serial.trunc() as i64;
    let date = date_epoch(date1904)
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| format!("date serial '{serial}' overflows the calendar"))?;
    let seconds_of_day = (serial.fract().abs() * 86_400.0).round().clamp(0.0, 86_399.0) as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds_of_day, 0)
        .ok_or_else(|| format!("date serial '{serial}' has an invalid time-of-day component"))?;
    let datetime = NaiveDateTime::new(date, time);

    let pattern = match &config.date_format {
        Some(explicit) => explicit.clone(),
        None => translate_date_format(format.unwrap_or("")),
    };
    Ok(datetime.format(&pattern).to_string().trim().to_string())
}

fn render_time(serial: f64, config: &Config) -> Result<String, String> {
    if !serial.is_finite() {
        return Err(format!("time serial '{serial}' is not finite"));
    }
    let total_seconds = ((serial.rem_euclid(1.0)) * 86_400.0 * 1_000_000.0).round() / 1_000_000.0;
    let whole_seconds = total_seconds.trunc() as u32 % 86_400;
    let nanos = ((total_seconds.fract()) * 1_000_000_000.0).round() as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(whole_seconds, nanos)
        .ok_or_else(|| format!("time serial '{serial}' out of range"))?;
    Ok(time.format(&config.time_format).to_string())
}

static LOCALE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\$-[^\]]*\]").unwrap());

/// Translates a numFmt date/time code into a `chrono`-compatible strftime
/// pattern, per the ordered substitution table in §4.7.3. Each rule fires at
/// most once, applied left-to-right over the whole (already lowercased) string.
fn translate_date_format(format: &str) -> String {
    let mut pattern = LOCALE_TAG.replace_all(format, "").into_owned();
    if let Some(trailer) = pattern.find(";@") {
        pattern.truncate(trailer);
    }

    const RULES: &[(&str, &str)] = &[
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("hh:mm", "%H:%M"),
        ("h", "%I"),
        ("ss", "%S"),
        ("dddd", "d"),
        ("dd", "d"),
        ("d", "%d"),
        ("am/pm", "%p"),
        ("mmmm", "%B"),
        ("mmm", "%b"),
        (":mm", ":%M"),
        ("m", "%m"),
    ];
    for (from, to) in RULES {
        let Some(position) = pattern.find(from) else { continue };
        // Single-character rules (h/d/m) consume the whole run of repeats at
        // the match, not just one: a bare "mm" (no preceding mmm/mmmm/colon
        // rule to pre-collapse it) must still become one `%m`, not `%mm`.
        let run_end = if from.len() == 1 {
            let marker = from.as_bytes()[0];
            position + pattern[position..].bytes().take_while(|b| *b == marker).count()
        } else {
            position + from.len()
        };
        pattern.replace_range(position..run_end, to);
    }
    pattern
}

fn strip_trailing_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// A tiny subset of printf float formatting: `%f` (6 fixed decimals, the
/// Python default) and `%.<N>f`; any other pattern falls back to `%f`.
fn apply_float_format(pattern: &str, value: f64) -> String {
    static PRECISION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%\.(\d+)f$").unwrap());
    if let Some(captures) = PRECISION.captures(pattern) {
        if let Ok(precision) = captures[1].parse::<usize>() {
            return format!("{value:.precision$}");
        }
    }
    format!("{value:.6}")
}

/// Renders a numeric cell per §4.7.3's float rules. `scientific` reflects
/// whether the cell's *raw text* used scientific notation, independent of
/// `format` (a style-less/`general`-formatted cell can still be scientific).
fn render_float(value: f64, scientific: bool, format: Option<&str>, config: &Config) -> String {
    let format = format.unwrap_or("general");
    if scientific || format == "general" {
        strip_trailing_zeros(&apply_float_format(&config.float_format, value))
    } else if format.starts_with("0.0") {
        let fraction = format.split_once('.').map(|(_, fraction)| fraction).unwrap_or("");
        let mut decimals = fraction.chars().take_while(|c| *c == '0').count();
        if format.contains('%') {
            decimals += 1;
        }
        format!("{value:.decimals$}")
    } else {
        strip_trailing_zeros(&apply_float_format(&config.float_format, value))
    }
}

/// Whether `raw` looks like it was written in scientific notation (§4.7.3).
pub(crate) fn looks_scientific(raw: &str) -> bool {
    raw.contains('e') || raw.contains('E')
}

pub(crate) fn format_class_for(format: &str, raw: &str, scifloat: bool) -> Option<FormatClass> {
    crate::workbook::formats::classify_known(format)
        .or_else(|| crate::workbook::formats::classify_fallback(raw, format, scifloat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn date_epoch_matches_scenario_b() {
        // Scenario B (§8): date1904=false, serial 44197, format mm-dd-yy -> 01-01-21.
        let config = Config::default();
        let rendered = render_date(44197.0, Some("mm-dd-yy"), &config, false).unwrap();
        assert_eq!(rendered, "01-01-21");
    }

    #[test]
    fn date1904_epoch_serial_one_is_jan_second() {
        let config = Config::default();
        let rendered = render_date(1.0, Some("yyyy-mm-dd"), &config, true).unwrap();
        assert_eq!(rendered, "1904-01-02");
    }

    #[test]
    fn time_serial_renders_scenario_c() {
        // Scenario C: format h:mm, value 0.75 -> 18:00.
        let config = Config::default();
        let rendered = render_time(0.75, &config).unwrap();
        assert_eq!(rendered, "18:00");
    }

    #[test]
    fn scientific_float_strips_trailing_zeros() {
        // Scenario E: raw text "1.23E+2" is scientific, general format -> 123.
        let config = Config::default();
        let rendered = render_float(123.0, true, Some("general"), &config);
        assert_eq!(rendered, "123");
    }

    #[test]
    fn zero_point_zero_format_uses_fraction_length() {
        let config = Config::default();
        assert_eq!(render_float(1.5, false, Some("0.00"), &config), "1.50");
        assert_eq!(render_float(0.5, false, Some("0.0%"), &config), "0.50");
    }

    #[test]
    fn translate_format_table_examples() {
        assert_eq!(translate_date_format("yyyy-mm-dd"), "%Y-%m-%d");
        assert_eq!(translate_date_format("mm-dd-yy"), "%m-%d-%y");
        assert_eq!(translate_date_format("h:mm am/pm"), "%I:%M %p");
    }
}

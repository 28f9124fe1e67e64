//! Built-in number-format tables and the format→class dispatch.
//!
//! Classification goes through an explicit format-string lookup table rather
//! than being baked into the cell-type enum itself, so that a caller-supplied
//! `dateformat`/`timeformat`/`floatformat` can still apply uniformly afterwards.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// The value class a resolved number format (or an absent one) maps a cell to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FormatClass {
    Float,
    Percentage,
    Date,
    Time,
    String,
    Boolean,
}

impl FormatClass {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatClass::Float => "float",
            FormatClass::Percentage => "percentage",
            FormatClass::Date => "date",
            FormatClass::Time => "time",
            FormatClass::String => "string",
            FormatClass::Boolean => "boolean",
        }
    }

    pub fn parse(name: &str) -> Option<FormatClass> {
        match name {
            "float" => Some(FormatClass::Float),
            "percentage" => Some(FormatClass::Percentage),
            "date" => Some(FormatClass::Date),
            "time" => Some(FormatClass::Time),
            "string" => Some(FormatClass::String),
            "boolean" => Some(FormatClass::Boolean),
            _ => None,
        }
    }
}

/// Built-in (ECMA-376 §18.8.30) number-format ids this crate recognizes, lowercased.
pub(crate) fn standard_format(id: u32) -> Option<&'static str> {
    let code = match id {
        0 => "general",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00e+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm am/pm",
        19 => "h:mm:ss am/pm",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0e+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// Explicit format-string → class table. Keys must already be lowercased
/// (format codes are lowercased and backslash-stripped at parse time, §4.6).
pub(crate) fn classify_known(format: &str) -> Option<FormatClass> {
    let class = match format {
        "general" | "0" | "0.00" | "#,##0" | "#,##0.00" | "0.00e+00" | "# ?/?" | "# ??/??"
        | "#,##0 ;(#,##0)" | "#,##0 ;[red](#,##0)" | "#,##0.00;(#,##0.00)"
        | "#,##0.00;[red](#,##0.00)" | "##0.0e+0" => FormatClass::Float,
        "0%" | "0.00%" => FormatClass::Percentage,
        "mm-dd-yy" | "d-mmm-yy" | "d-mmm" | "mmm-yy" | "m/d/yy h:mm" => FormatClass::Date,
        "h:mm am/pm" | "h:mm:ss am/pm" | "h:mm" | "h:mm:ss" | "mm:ss" | "[h]:mm:ss" | "mmss.0" => {
            FormatClass::Time
        }
        "@" => FormatClass::String,
        _ => return None,
    };
    Some(class)
}

static DATE_TIME_TOKENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[hsmdy]").unwrap());
static BRACKETED_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static INTEGER_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").unwrap());
static PLAIN_FLOAT_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());
static SCI_FLOAT_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?([eE][-+]?\d+)?$").unwrap());

/// Fallback classification for a format string with no explicit table entry
/// (§4.7.3 step 3). `raw` is the cell's unparsed text. `scifloat` gates
/// whether a scientific-notation literal is accepted as a float here; when
/// it is off, such a literal matches neither pattern and falls through to
/// "emit raw" at the call site.
pub(crate) fn classify_fallback(raw: &str, format: &str, scifloat: bool) -> Option<FormatClass> {
    let format_lower = format.to_ascii_lowercase();
    let has_duration_token = BRACKETED_TOKEN.find_iter(&format_lower).any(|m| {
        let inner = m.as_str();
        inner.contains('h') || inner.contains('m') || inner.contains('s') || inner.contains('d')
    });

    if INTEGER_LIKE.is_match(raw) && DATE_TIME_TOKENS.is_match(&format_lower) && !has_duration_token {
        let value: f64 = raw.parse().ok()?;
        return Some(if value >= 1.0 { FormatClass::Date } else { FormatClass::Time });
    }

    let matches_float = if scifloat { SCI_FLOAT_LIKE.is_match(raw) } else { PLAIN_FLOAT_LIKE.is_match(raw) };
    if matches_float {
        return Some(FormatClass::Float);
    }

    None
}

//! Thin CLI wired to the `xlsx2csv` library (§6). Owns argument parsing and
//! output-stream/directory setup; every conversion decision lives in the
//! library's [`xlsx2csv::Workbook`]. Uses `anyhow::Context` to annotate
//! failures with the argument or path that caused them.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use xlsx2csv::{Config, FormatClass, LineTerminator, OutputSink, Quoting, SheetSelector, Workbook};

/// Convert an Office Open XML (`.xlsx`) workbook to CSV.
#[derive(Parser, Debug)]
#[command(name = "xlsx2csv", version, about)]
struct Cli {
    /// Workbook to convert.
    infile: PathBuf,

    /// Output path. Defaults to stdout; a directory path when `--all` writes
    /// one file per sheet.
    outfile: Option<PathBuf>,

    /// 1-based sheet index to convert (ignored if `--sheetname` or `--all` is given).
    #[arg(long, default_value_t = 1)]
    sheet: usize,

    /// Sheet name to convert, overriding `--sheet`.
    #[arg(long)]
    sheetname: Option<String>,

    /// Convert every sheet (subject to the include/exclude filters below).
    #[arg(long)]
    all: bool,

    /// Field delimiter: a literal character, `tab`, `comma`, or `x<hex>`.
    #[arg(long, default_value = "comma")]
    delimiter: String,

    /// Line terminator: `\n`, `\r`, or `\r\n`.
    #[arg(long = "lineterminator", default_value = "\\n")]
    line_terminator: String,

    /// Header line written before each sheet when concatenating `--all` output
    /// onto a single stream.
    #[arg(long, default_value = "--------")]
    sheetdelimiter: String,

    /// CSV quoting mode.
    #[arg(long, value_enum, default_value = "minimal")]
    quoting: QuotingArg,

    /// Explicit strftime-style date format, overriding the translated numFmt code.
    #[arg(long)]
    dateformat: Option<String>,

    /// strftime-style time format.
    #[arg(long, default_value = "%H:%M")]
    timeformat: String,

    /// printf-style float format (`%f` or `%.<N>f`).
    #[arg(long, default_value = "%f")]
    floatformat: String,

    /// Treat scientific-notation cell text as eligible for float rendering
    /// even when combined with a non-general format.
    #[arg(long = "sci-float")]
    sci_float: bool,

    /// Only convert sheets whose name matches one of these patterns (OR'd together).
    #[arg(long = "include-sheet-pattern")]
    include_sheet_pattern: Vec<String>,

    /// Skip sheets whose name matches one of these patterns (OR'd together).
    #[arg(long = "exclude-sheet-pattern")]
    exclude_sheet_pattern: Vec<String>,

    /// Skip hidden and very-hidden sheets in `--all` mode.
    #[arg(long = "exclude-hidden-sheets")]
    exclude_hidden_sheets: bool,

    /// Include rows marked `hidden="1"` (excluded by default).
    #[arg(long = "include-hidden-rows")]
    include_hidden_rows: bool,

    /// Skip rows that densify to every field empty, instead of emitting a blank line.
    #[arg(long = "ignoreempty")]
    ignore_empty: bool,

    /// Fix row width to the last non-empty column seen in the first non-empty row.
    #[arg(long = "skipemptycolumns")]
    skip_empty_columns: bool,

    /// Escape `\r`/`\n`/`\t` in shared-string text as literal backslash sequences.
    #[arg(long)]
    escape: bool,

    /// Collapse `\r`/`\n`/`\t` in shared-string text to a single space. Wins over `--escape`.
    #[arg(long = "no-line-breaks")]
    no_line_breaks: bool,

    /// Wrap hyperlinked cells as `<a href='...'>value</a>`.
    #[arg(long)]
    hyperlinks: bool,

    /// Propagate a merged range's anchor value to every cell it covers.
    #[arg(long = "merge-cells")]
    merge_cells: bool,

    /// Value classes (`float`, `percentage`, `date`, `time`, `string`, `boolean`)
    /// to leave as raw, unconverted cell text.
    #[arg(long = "ignore-formats")]
    ignore_formats: Vec<String>,

    /// Output text encoding (e.g. `utf-8`, `latin1`, `windows-1252`). Any
    /// label the WHATWG encoding standard recognizes is accepted.
    #[arg(long = "outputencoding", default_value = "utf-8")]
    output_encoding: String,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum QuotingArg {
    None,
    Minimal,
    Nonnumeric,
    All,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("xlsx2csv: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let selector = if let Some(name) = &cli.sheetname {
        SheetSelector::Name(name.clone())
    } else if cli.all {
        SheetSelector::Index(0)
    } else {
        SheetSelector::Index(cli.sheet)
    };

    let mut workbook = Workbook::open_path(&cli.infile)
        .with_context(|| format!("failed to open workbook '{}'", cli.infile.display()))?;

    let output = resolve_output(cli.outfile.as_deref(), matches!(selector, SheetSelector::Index(0)))?;

    workbook.convert(output, &selector, &config).context("conversion failed")?;
    Ok(())
}

/// Resolves the positional `outfile` argument into an [`OutputSink`] (§4.9,
/// §7 `OutFileExists`). All-sheets mode treats an existing directory (or a
/// path with no extension) as a per-sheet output directory; anything else is
/// a single stream, defaulting to stdout.
fn resolve_output(outfile: Option<&std::path::Path>, all_sheets: bool) -> Result<OutputSink> {
    let Some(path) = outfile else {
        return Ok(OutputSink::Writer(Box::new(BufWriter::new(io::stdout()))));
    };

    if all_sheets && (path.is_dir() || path.extension().is_none()) {
        return Ok(OutputSink::Directory(path.to_path_buf()));
    }

    let file = File::create(path).with_context(|| format!("failed to create output file '{}'", path.display()))?;
    Ok(OutputSink::Writer(Box::new(BufWriter::new(file))))
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::default();

    config.delimiter = parse_delimiter(&cli.delimiter)?;
    config.line_terminator = parse_line_terminator(&cli.line_terminator)?;
    config.sheet_delimiter = cli.sheetdelimiter.clone();
    config.quoting = match cli.quoting {
        QuotingArg::None => Quoting::None,
        QuotingArg::Minimal => Quoting::Minimal,
        QuotingArg::Nonnumeric => Quoting::NonNumeric,
        QuotingArg::All => Quoting::All,
    };

    config.date_format = cli.dateformat.clone();
    config.time_format = cli.timeformat.clone();
    config.float_format = cli.floatformat.clone();
    config.scifloat = cli.sci_float;

    config.include_sheet_patterns = compile_patterns(&cli.include_sheet_pattern)?;
    config.exclude_sheet_patterns = compile_patterns(&cli.exclude_sheet_pattern)?;
    config.exclude_hidden_sheets = cli.exclude_hidden_sheets;

    config.skip_hidden_rows = !cli.include_hidden_rows;
    config.skip_empty_lines = cli.ignore_empty;
    config.skip_trailing_columns = cli.skip_empty_columns;

    config.escape = cli.escape;
    config.no_line_breaks = cli.no_line_breaks;
    config.hyperlinks = cli.hyperlinks;
    config.merge_cells = cli.merge_cells;

    config.output_encoding = encoding_rs::Encoding::for_label(cli.output_encoding.as_bytes())
        .ok_or_else(|| anyhow::anyhow!("unrecognized --outputencoding '{}'", cli.output_encoding))?;

    config.ignore_formats = cli
        .ignore_formats
        .iter()
        .map(|name| FormatClass::parse(name).ok_or_else(|| anyhow::anyhow!("invalid --ignore-formats class '{name}'")))
        .collect::<Result<HashSet<_>>>()?;

    Ok(config)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<regex::Regex>> {
    patterns
        .iter()
        .map(|pattern| regex::Regex::new(pattern).with_context(|| format!("invalid pattern '{pattern}'")))
        .collect()
}

/// Parses `--delimiter`: `tab`, `comma`, `x<hex>`, or a single literal byte (§6).
fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "tab" => Ok(b'\t'),
        "comma" => Ok(b','),
        _ if raw.len() > 1 && raw.starts_with('x') => {
            u8::from_str_radix(&raw[1..], 16).with_context(|| format!("invalid hex delimiter 'x{}'", &raw[1..]))
        }
        _ if raw.len() == 1 => Ok(raw.as_bytes()[0]),
        _ => bail!("invalid --delimiter '{raw}'"),
    }
}

/// Parses `--lineterminator`, accepting both the raw characters and their
/// escaped (`\n`, `\r`, `\r\n`) spellings as typed on a command line (§6).
fn parse_line_terminator(raw: &str) -> Result<LineTerminator> {
    match raw {
        "\n" | "\\n" => Ok(LineTerminator::Lf),
        "\r" | "\\r" => Ok(LineTerminator::Cr),
        "\r\n" | "\\r\\n" => Ok(LineTerminator::CrLf),
        _ => bail!("invalid --lineterminator '{raw}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["xlsx2csv"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn outputencoding_defaults_to_utf8() {
        let config = build_config(&parse(&["in.xlsx"])).unwrap();
        assert_eq!(config.output_encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn outputencoding_accepts_a_recognized_label() {
        let config = build_config(&parse(&["in.xlsx", "--outputencoding", "latin1"])).unwrap();
        assert_eq!(config.output_encoding, encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn outputencoding_rejects_an_unrecognized_label() {
        let error = build_config(&parse(&["in.xlsx", "--outputencoding", "not-a-real-encoding"])).unwrap_err();
        assert!(error.to_string().contains("not-a-real-encoding"));
    }
}

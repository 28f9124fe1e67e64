//! A1-style cell address encoding, decoding, and range expansion.
//!
//! Rows and columns are 0-based everywhere in this module (matching the rest of
//! the decoder); only the rendered address string uses Excel's 1-based, A=1
//! convention with no zero digit.

/// Converts a column letter sequence (e.g. `"A"`, `"AA"`) to a 0-based column index.
pub(crate) fn column_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut value: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        value = value * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    value.checked_sub(1)
}

/// Converts a 0-based column index back to its letter sequence.
pub(crate) fn index_to_column(index: usize) -> String {
    let mut column = index as u32 + 1;
    let mut letters = String::new();
    while column > 0 {
        column -= 1;
        let digit = char::from_u32(b'A' as u32 + column % 26).expect("digit in A..=Z");
        column /= 26;
        letters.insert(0, digit);
    }
    letters
}

/// Splits an A1-style reference into its leading column-letter and trailing row-digit parts.
pub(crate) fn split_reference(reference: &str) -> Option<(&str, &str)> {
    let split_at = reference.find(|c: char| c.is_ascii_digit())?;
    Some((&reference[..split_at], &reference[split_at..]))
}

/// Parses an A1-style reference (e.g. `"B7"`) into 0-based `(row, column)`.
pub(crate) fn parse_reference(reference: &str) -> Option<(usize, usize)> {
    let (column, row) = split_reference(reference)?;
    let row: usize = row.parse().ok()?;
    let column = column_to_index(column)?;
    Some((row.checked_sub(1)?, column))
}

/// Renders 0-based `(row, column)` as an A1-style reference.
pub(crate) fn format_reference(row: usize, column: usize) -> String {
    format!("{}{}", index_to_column(column), row + 1)
}

/// Expands a range reference (`"A3:C12"`) into every address it covers, in
/// column-major order (all of column A's rows, then all of column B's, ...).
/// A bare single-cell reference (no `:`) expands to just itself.
pub(crate) fn expand_range(range: &str) -> Vec<String> {
    let Some((start, end)) = range.split_once(':') else {
        return vec![range.to_string()];
    };
    let (Some((start_row, start_col)), Some((end_row, end_col))) =
        (parse_reference(start), parse_reference(end))
    else {
        return Vec::new();
    };

    let (row_lo, row_hi) = (start_row.min(end_row), start_row.max(end_row));
    let (col_lo, col_hi) = (start_col.min(end_col), start_col.max(end_col));
    let mut addresses = Vec::with_capacity((row_hi - row_lo + 1) * (col_hi - col_lo + 1));
    for col in col_lo..=col_hi {
        for row in row_lo..=row_hi {
            addresses.push(format_reference(row, col));
        }
    }
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_round_trip() {
        for index in 0..1000usize {
            let letters = index_to_column(index);
            assert_eq!(column_to_index(&letters), Some(index));
        }
    }

    #[test]
    fn known_columns() {
        assert_eq!(column_to_index("A"), Some(0));
        assert_eq!(column_to_index("Z"), Some(25));
        assert_eq!(column_to_index("AA"), Some(26));
        assert_eq!(index_to_column(0), "A");
        assert_eq!(index_to_column(25), "Z");
        assert_eq!(index_to_column(26), "AA");
    }

    #[test]
    fn reference_round_trip() {
        assert_eq!(parse_reference("B7"), Some((6, 1)));
        assert_eq!(format_reference(6, 1), "B7");
    }

    #[test]
    fn range_expansion_is_column_major() {
        let addresses = expand_range("A1:B2");
        assert_eq!(addresses, vec!["A1", "A2", "B1", "B2"]);
    }

    #[test]
    fn single_cell_range_expands_to_itself() {
        assert_eq!(expand_range("C3"), vec!["C3".to_string()]);
    }
}

//! Cell records and A1-style coordinate handling

use serde::{Deserialize, Serialize};

/// A single workbook cell with translatable text content.
///
/// Row and column indices are 1-based; the column letter form is only
/// used for display and for matching `r` attributes in sheet XML, never
/// as the cell's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
    /// Current text, replaced by the translation before patching.
    pub value: String,
    /// Text as found in the package.
    pub original_value: String,
    pub is_formula: bool,
}

impl Cell {
    /// A1-style reference of this cell (e.g. "B3").
    pub fn reference(&self) -> String {
        format!("{}{}", column_letter(self.col), self.row)
    }
}

/// Convert a 1-based column index to its letter label (1 -> A, 27 -> AA).
pub fn column_letter(mut col: u32) -> String {
    let mut label = String::new();
    while col > 0 {
        col -= 1;
        label.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    label
}

/// Convert a column letter label to its 1-based index (A -> 1, AA -> 27).
///
/// Returns `None` for empty or non-alphabetic input.
pub fn column_index(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut col = 0u32;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Some(col)
}

/// Parse a cell reference like "AB10" into 1-based (row, col).
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let split = cell_ref.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell_ref.split_at(split);
    let col = column_index(letters)?;
    let row = digits.parse::<u32>().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, col))
}

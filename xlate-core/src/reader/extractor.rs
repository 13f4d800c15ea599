//! Streaming extraction of translatable cells

use crate::cell::{Cell, parse_cell_ref};
use crate::error::{Error, Result};
use crate::reader::{XlsxPackage, read_text_node, xml_err};
use anyhow::Context;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read, Seek};

/// Scans sheet parts for cells worth translating.
///
/// A cell is translatable when its resolved value is string-typed
/// (shared string, literal, or inline string), non-empty after
/// trimming, and not a formula. The structural `<f>` marker wins over
/// the literal `=` prefix, which is only a fallback.
pub struct CellExtractor<'a, R: Read + Seek> {
    package: &'a mut XlsxPackage<R>,
}

impl<'a, R: Read + Seek> CellExtractor<'a, R> {
    pub fn new(package: &'a mut XlsxPackage<R>) -> Self {
        Self { package }
    }

    /// Extract every translatable cell, optionally restricted to a set
    /// of sheet names. Sheets that cannot be resolved or scanned are
    /// returned as `(name, error)` pairs instead of aborting the rest.
    pub fn extract_cells(
        &mut self,
        sheets: Option<&HashSet<String>>,
    ) -> (Vec<Cell>, Vec<(String, Error)>) {
        let requested = requested_sheets(self.package.sheet_names(), sheets);
        let mut cells = Vec::new();
        let mut failed = Vec::new();
        for name in requested {
            match self.extract_sheet(&name) {
                Ok(mut sheet_cells) => cells.append(&mut sheet_cells),
                Err(err) => failed.push((name, err)),
            }
        }
        (cells, failed)
    }

    /// Scan one sheet part and return its translatable cells in
    /// document (row-major) order. Restartable: each call streams the
    /// part again from the archive.
    pub fn extract_sheet(&mut self, sheet_name: &str) -> Result<Vec<Cell>> {
        let part = self.package.sheet_part(sheet_name)?.to_string();
        let (archive, shared) = self.package.archive_and_strings()?;
        let file = archive.by_name(&part)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        scan_sheet(&mut reader, sheet_name, shared).map_err(|e| xml_err(&part, format!("{e:#}")))
    }
}

fn requested_sheets(names: &[String], filter: Option<&HashSet<String>>) -> Vec<String> {
    match filter {
        None => names.to_vec(),
        Some(filter) => {
            // Workbook order for known names, then the unknown ones so
            // they surface as resolution faults.
            let mut requested: Vec<String> =
                names.iter().filter(|n| filter.contains(*n)).cloned().collect();
            let mut missing: Vec<String> = filter
                .iter()
                .filter(|n| !names.contains(*n))
                .cloned()
                .collect();
            missing.sort();
            requested.extend(missing);
            requested
        }
    }
}

struct CellContent {
    value: Option<String>,
    has_formula: bool,
}

fn scan_sheet<B: BufRead>(
    reader: &mut Reader<B>,
    sheet_name: &str,
    shared: &[String],
) -> anyhow::Result<Vec<Cell>> {
    let mut cells = Vec::new();
    let mut buf = Vec::new();
    let mut current_row = 0u32;
    let mut current_col = 0u32;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"row" => {
                    current_row = row_number(&e, current_row + 1)?;
                    current_col = 0;
                }
                b"c" => {
                    let (row, col, t_attr) = cell_attrs(&e, current_row, current_col)?;
                    current_row = row;
                    current_col = col;
                    let content = read_cell_contents(reader, &t_attr, shared)?;
                    push_if_translatable(&mut cells, sheet_name, row, col, content);
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"row" => {
                    current_row = row_number(&e, current_row + 1)?;
                    current_col = 0;
                }
                b"c" => {
                    // Self-closed cell: no value, nothing to yield.
                    let (row, col, _) = cell_attrs(&e, current_row, current_col)?;
                    current_row = row;
                    current_col = col;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(cells)
}

fn row_number(e: &BytesStart, fallback: u32) -> anyhow::Result<u32> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"r" {
            if let Ok(row) = attr.unescape_value()?.parse::<u32>() {
                return Ok(row);
            }
        }
    }
    Ok(fallback)
}

/// Position and type of a cell node; cells without an `r` attribute
/// take the next column in the current row.
fn cell_attrs(
    e: &BytesStart,
    current_row: u32,
    current_col: u32,
) -> anyhow::Result<(u32, u32, String)> {
    let mut reference = None;
    let mut t_attr = String::new();
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => reference = Some(attr.unescape_value()?.to_string()),
            b"t" => t_attr = attr.unescape_value()?.to_string(),
            _ => {}
        }
    }
    let (row, col) = reference
        .as_deref()
        .and_then(parse_cell_ref)
        .unwrap_or((current_row.max(1), current_col + 1));
    Ok((row, col, t_attr))
}

/// Consume a cell's children up to `</c>`, resolving its value text
/// and noting whether it carries a formula.
fn read_cell_contents<B: BufRead>(
    reader: &mut Reader<B>,
    t_attr: &str,
    shared: &[String],
) -> anyhow::Result<CellContent> {
    let mut value = None;
    let mut has_formula = false;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"v" => {
                    let text = if matches!(event, Event::Start(_)) {
                        read_text_node(reader)?
                    } else {
                        String::new()
                    };
                    match t_attr {
                        "s" => {
                            let index: usize = text
                                .trim()
                                .parse()
                                .with_context(|| format!("bad shared string index '{text}'"))?;
                            let entry = shared.get(index).with_context(|| {
                                format!("shared string index {index} out of range")
                            })?;
                            value = Some(entry.clone());
                        }
                        "str" => value = Some(text),
                        // Numeric, boolean, error, and date-typed
                        // values are never translatable.
                        _ => {}
                    }
                }
                b"f" => {
                    has_formula = true;
                    if matches!(event, Event::Start(_)) {
                        read_text_node(reader)?;
                    }
                }
                b"is" => {
                    if matches!(event, Event::Start(_)) {
                        value = Some(read_inline_string(reader)?);
                    }
                }
                _ => {}
            },
            Event::End(ref e) if e.name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(CellContent { value, has_formula })
}

/// Inline strings can hold multiple `<t>` runs.
fn read_inline_string<B: BufRead>(reader: &mut Reader<B>) -> anyhow::Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"t" => {
                text.push_str(&read_text_node(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"is" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn push_if_translatable(
    cells: &mut Vec<Cell>,
    sheet_name: &str,
    row: u32,
    col: u32,
    content: CellContent,
) {
    if content.has_formula {
        return;
    }
    let Some(text) = content.value else {
        return;
    };
    if text.trim().is_empty() || text.starts_with('=') {
        return;
    }
    cells.push(Cell {
        sheet: sheet_name.to_string(),
        row,
        col,
        value: text.clone(),
        original_value: text,
        is_formula: false,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn mock_package(
        sheet_data: &str,
        shared_strings: Option<&str>,
    ) -> XlsxPackage<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(
            br#"<workbook><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        )
        .unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(
            br#"<Relationships><Relationship Id="rId1" Type="t" Target="worksheets/sheet1.xml"/></Relationships>"#,
        )
        .unwrap();

        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        let sheet = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet><sheetData>{}</sheetData></worksheet>"#,
            sheet_data
        );
        zip.write_all(sheet.as_bytes()).unwrap();

        if let Some(sst) = shared_strings {
            zip.start_file("xl/sharedStrings.xml", options).unwrap();
            zip.write_all(sst.as_bytes()).unwrap();
        }

        let cursor = zip.finish().unwrap();
        XlsxPackage::open(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_shared_and_inline_strings_are_yielded() {
        let mut package = mock_package(
            concat!(
                r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>42</v></c></row>"#,
                r#"<row r="2"><c r="A2" t="inlineStr"><is><t>inline text</t></is></c></row>"#,
            ),
            Some(r#"<sst><si><t>Hello</t></si></sst>"#),
        );
        let mut extractor = CellExtractor::new(&mut package);
        let cells = extractor.extract_sheet("Sheet1").unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].reference(), "A1");
        assert_eq!(cells[0].value, "Hello");
        assert_eq!(cells[1].reference(), "A2");
        assert_eq!(cells[1].value, "inline text");
    }

    #[test]
    fn test_formula_cells_are_excluded() {
        let mut package = mock_package(
            concat!(
                // Structural marker, cached string result
                r#"<row r="1"><c r="A1" t="str"><f>CONCAT(B1,C1)</f><v>cached</v></c>"#,
                // Literal that merely looks like a formula
                r#"<c r="B1" t="inlineStr"><is><t>=SUM(A1:A2)</t></is></c>"#,
                r#"<c r="C1" t="str"><v>keep me</v></c></row>"#,
            ),
            None,
        );
        let mut extractor = CellExtractor::new(&mut package);
        let cells = extractor.extract_sheet("Sheet1").unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].reference(), "C1");
        assert_eq!(cells[0].value, "keep me");
    }

    #[test]
    fn test_blank_and_numeric_values_are_excluded() {
        let mut package = mock_package(
            concat!(
                r#"<row r="1"><c r="A1" t="str"><v>   </v></c>"#,
                r#"<c r="B1"><v>3.14</v></c>"#,
                r#"<c r="C1" t="b"><v>1</v></c>"#,
                r#"<c r="D1"/></row>"#,
            ),
            None,
        );
        let mut extractor = CellExtractor::new(&mut package);
        let cells = extractor.extract_sheet("Sheet1").unwrap();
        assert!(cells.is_empty());
    }

    #[test]
    fn test_out_of_range_shared_index_is_an_error() {
        let mut package = mock_package(
            r#"<row r="1"><c r="A1" t="s"><v>5</v></c></row>"#,
            Some(r#"<sst><si><t>only</t></si></sst>"#),
        );
        let mut extractor = CellExtractor::new(&mut package);
        let result = extractor.extract_sheet("Sheet1");
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_cells_without_reference_get_positions() {
        let mut package = mock_package(
            r#"<row r="3"><c t="str"><v>first</v></c><c t="str"><v>second</v></c></row>"#,
            None,
        );
        let mut extractor = CellExtractor::new(&mut package);
        let cells = extractor.extract_sheet("Sheet1").unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!((cells[0].row, cells[0].col), (3, 1));
        assert_eq!((cells[1].row, cells[1].col), (3, 2));
        assert_eq!(cells[1].reference(), "B3");
    }

    #[test]
    fn test_extraction_is_restartable() {
        let mut package = mock_package(
            r#"<row r="1"><c r="A1" t="str"><v>once</v></c></row>"#,
            None,
        );
        let mut extractor = CellExtractor::new(&mut package);
        let first = extractor.extract_sheet("Sheet1").unwrap();
        let second = extractor.extract_sheet("Sheet1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_sheet_is_isolated_fault() {
        let mut package = mock_package(
            r#"<row r="1"><c r="A1" t="str"><v>text</v></c></row>"#,
            None,
        );
        let mut extractor = CellExtractor::new(&mut package);
        let filter: HashSet<String> =
            ["Sheet1".to_string(), "Sheet2".to_string()].into_iter().collect();
        let (cells, failed) = extractor.extract_cells(Some(&filter));
        assert_eq!(cells.len(), 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "Sheet2");
        assert!(matches!(failed[0].1, Error::Resolution(_)));
    }
}

//! Selective rewriting of worksheet XML
//!
//! The patcher streams a sheet part event by event and copies every
//! node through untouched unless the cell it belongs to has a pending
//! update. Only updated `<c>` elements are rebuilt; formatting,
//! namespaces, and unrelated markup keep their original bytes.

use crate::cell::{column_letter, parse_cell_ref};
use crate::error::{Error, Result};
use anyhow::Context;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::Cursor;

/// Result of patching one sheet part.
pub struct PatchOutcome {
    /// The rewritten part, byte-identical to the input outside updated
    /// cells.
    pub xml: Vec<u8>,
    /// Updates that matched a cell and were written.
    pub applied: usize,
    /// A1 references of updates that matched no cell, in row-major
    /// order.
    pub misses: Vec<String>,
}

/// Apply `updates` (keyed by 1-based `(row, col)`) to a sheet part.
pub fn patch_sheet_xml(
    part: &str,
    xml: &[u8],
    updates: &HashMap<(u32, u32), String>,
) -> Result<PatchOutcome> {
    rewrite_sheet(xml, updates).map_err(|e| Error::Patch {
        part: part.to_string(),
        message: format!("{e:#}"),
    })
}

fn rewrite_sheet(
    xml: &[u8],
    updates: &HashMap<(u32, u32), String>,
) -> anyhow::Result<PatchOutcome> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut current_row = 0u32;
    let mut current_col = 0u32;
    let mut remaining: HashMap<(u32, u32), &str> =
        updates.iter().map(|(k, v)| (*k, v.as_str())).collect();

    loop {
        let event = reader.read_event_into(&mut buf).context("malformed sheet XML")?;
        match event {
            Event::Start(ref e) if e.name().as_ref() == b"row" => {
                current_row = row_number(e, current_row + 1)?;
                current_col = 0;
                writer.write_event(event)?;
            }
            Event::Empty(ref e) if e.name().as_ref() == b"row" => {
                current_row = row_number(e, current_row + 1)?;
                current_col = 0;
                writer.write_event(event)?;
            }
            Event::Start(ref e) if e.name().as_ref() == b"c" => {
                let (row, col) = cell_position(e, current_row, current_col)?;
                current_row = row;
                current_col = col;
                match remaining.remove(&(row, col)) {
                    Some(text) => rewrite_cell(&mut reader, &mut writer, e, text, false)?,
                    None => writer.write_event(event)?,
                }
            }
            Event::Empty(ref e) if e.name().as_ref() == b"c" => {
                let (row, col) = cell_position(e, current_row, current_col)?;
                current_row = row;
                current_col = col;
                match remaining.remove(&(row, col)) {
                    Some(text) => rewrite_cell(&mut reader, &mut writer, e, text, true)?,
                    None => writer.write_event(event)?,
                }
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }

    let mut missed: Vec<(u32, u32)> = remaining.into_keys().collect();
    missed.sort();
    let misses: Vec<String> = missed
        .into_iter()
        .map(|(row, col)| format!("{}{}", column_letter(col), row))
        .collect();

    Ok(PatchOutcome {
        xml: writer.into_inner().into_inner(),
        applied: updates.len() - misses.len(),
        misses,
    })
}

/// Rebuild one `<c>` element around the new text.
///
/// Shared and literal string cells become `t="str"` with a `<v>` node;
/// inline string cells keep `t="inlineStr"` and get a fresh
/// `<is><t>` run. Formula children are carried over, old value nodes
/// are dropped.
fn rewrite_cell(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Cursor<Vec<u8>>>,
    cell: &BytesStart,
    text: &str,
    self_closed: bool,
) -> anyhow::Result<()> {
    let mut open = BytesStart::new("c");
    let mut inline = false;
    let mut has_type = false;
    for attr in cell.attributes() {
        let attr = attr.context("bad cell attribute")?;
        if attr.key.as_ref() == b"t" {
            has_type = true;
            if attr.value.as_ref() == b"inlineStr" {
                inline = true;
                open.push_attribute(("t", "inlineStr"));
            } else {
                open.push_attribute(("t", "str"));
            }
        } else {
            open.push_attribute(attr);
        }
    }
    if !has_type {
        open.push_attribute(("t", "str"));
    }
    writer.write_event(Event::Start(open))?;

    if !self_closed {
        // Carry formula subtrees through, drop the old value nodes.
        let mut buf = Vec::new();
        loop {
            let event = reader.read_event_into(&mut buf).context("malformed cell XML")?;
            match event {
                Event::Start(ref e)
                    if matches!(e.name().as_ref(), b"v" | b"is") =>
                {
                    let end = e.to_end().into_owned();
                    let mut skip = Vec::new();
                    reader
                        .read_to_end_into(end.name(), &mut skip)
                        .context("malformed cell XML")?;
                }
                Event::Empty(ref e) if matches!(e.name().as_ref(), b"v" | b"is") => {}
                Event::End(ref e) if e.name().as_ref() == b"c" => break,
                Event::Eof => break,
                other => writer.write_event(other)?,
            }
            buf.clear();
        }
    }

    if inline {
        writer.write_event(Event::Start(BytesStart::new("is")))?;
        writer.write_event(Event::Start(BytesStart::new("t")))?;
        writer.write_event(Event::Text(BytesText::new(text)))?;
        writer.write_event(Event::End(BytesStart::new("t").to_end()))?;
        writer.write_event(Event::End(BytesStart::new("is").to_end()))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new("v")))?;
        writer.write_event(Event::Text(BytesText::new(text)))?;
        writer.write_event(Event::End(BytesStart::new("v").to_end()))?;
    }
    writer.write_event(Event::End(BytesStart::new("c").to_end()))?;
    Ok(())
}

fn row_number(e: &BytesStart, fallback: u32) -> anyhow::Result<u32> {
    for attr in e.attributes() {
        let attr = attr.context("bad row attribute")?;
        if attr.key.as_ref() == b"r" {
            if let Ok(row) = attr.unescape_value()?.parse::<u32>() {
                return Ok(row);
            }
        }
    }
    Ok(fallback)
}

fn cell_position(
    e: &BytesStart,
    current_row: u32,
    current_col: u32,
) -> anyhow::Result<(u32, u32)> {
    for attr in e.attributes() {
        let attr = attr.context("bad cell attribute")?;
        if attr.key.as_ref() == b"r" {
            if let Some(pos) = parse_cell_ref(&attr.unescape_value()?) {
                return Ok(pos);
            }
        }
    }
    Ok((current_row.max(1), current_col + 1))
}

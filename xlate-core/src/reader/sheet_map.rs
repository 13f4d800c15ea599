//! Sheet name to worksheet part resolution

use crate::error::{Error, Result};
use crate::reader::xml_err;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Cached mapping from sheet display names to worksheet part paths.
///
/// Built by composing the workbook manifest (`name` -> `r:id`) with the
/// workbook relationship table (`Id` -> `Target`); computed once per
/// package and reused for the whole run.
#[derive(Debug, Clone)]
pub struct SheetMap {
    order: Vec<String>,
    parts: HashMap<String, String>,
}

impl SheetMap {
    pub fn from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        let manifest = {
            let file = archive.by_name(WORKBOOK_PART)?;
            parse_manifest(BufReader::new(file)).map_err(|e| xml_err(WORKBOOK_PART, e))?
        };
        let targets = {
            let file = archive.by_name(WORKBOOK_RELS_PART)?;
            parse_relationships(BufReader::new(file))
                .map_err(|e| xml_err(WORKBOOK_RELS_PART, e))?
        };

        let mut order = Vec::with_capacity(manifest.len());
        let mut parts = HashMap::new();
        for (name, rid) in manifest {
            // A name whose relationship id has no target stays out of
            // the map; lookups report it as unresolved.
            if let Some(target) = targets.get(&rid) {
                parts.insert(name.clone(), part_path(target));
            }
            order.push(name);
        }
        Ok(SheetMap { order, parts })
    }

    /// Sheet display names in workbook document order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Resolve one sheet name to its part path.
    pub fn part(&self, sheet_name: &str) -> Result<&str> {
        self.parts
            .get(sheet_name)
            .map(String::as_str)
            .ok_or_else(|| Error::Resolution(sheet_name.to_string()))
    }
}

/// `(name, relationship id)` pairs from the workbook manifest, in
/// document order.
fn parse_manifest<B: BufRead>(
    source: B,
) -> std::result::Result<Vec<(String, String)>, quick_xml::Error> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"sheet" => {
                let mut name = String::new();
                let mut rid = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = attr.unescape_value()?.to_string(),
                        b"r:id" => rid = attr.unescape_value()?.to_string(),
                        _ => {}
                    }
                }
                if !name.is_empty() {
                    sheets.push((name, rid));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// `Id -> Target` pairs from a relationship part.
fn parse_relationships<B: BufRead>(
    source: B,
) -> std::result::Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut targets = HashMap::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value()?.to_string(),
                        b"Target" => target = attr.unescape_value()?.to_string(),
                        _ => {}
                    }
                }
                if !id.is_empty() && !target.is_empty() {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

/// Relationship targets are relative to the `xl/` part root unless they
/// carry a leading slash.
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

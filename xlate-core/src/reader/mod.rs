//! Package reader for OOXML spreadsheet containers

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub mod extractor;
mod sheet_map;

use self::sheet_map::SheetMap;

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// An opened spreadsheet package.
///
/// Holds the zip archive plus the sheet-name map resolved once at open
/// time. Entries are only decompressed when requested; the
/// shared-string table is loaded lazily on first use.
pub struct XlsxPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
    sheet_map: SheetMap,
    shared_strings: Option<Vec<String>>,
}

impl XlsxPackage<BufReader<File>> {
    /// Open a package from a file path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> XlsxPackage<R> {
    /// Open a package from any seekable byte source.
    pub fn open(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let sheet_map = SheetMap::from_archive(&mut archive)?;
        Ok(Self {
            archive,
            sheet_map,
            shared_strings: None,
        })
    }

    /// Entry paths in archive order.
    pub fn entry_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            names.push(self.archive.by_index_raw(i)?.name().to_string());
        }
        Ok(names)
    }

    /// Decompress and return one entry's bytes.
    pub fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut entry = self.archive.by_name(path)?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Sheet display names in workbook order.
    pub fn sheet_names(&self) -> &[String] {
        self.sheet_map.names()
    }

    /// Archive path of the worksheet part backing a sheet name.
    pub fn sheet_part(&self, sheet_name: &str) -> Result<&str> {
        self.sheet_map.part(sheet_name)
    }

    /// The shared-string table, loaded on first call.
    pub fn shared_strings(&mut self) -> Result<&[String]> {
        let (_, strings) = self.archive_and_strings()?;
        Ok(strings)
    }

    /// Split borrow used by the extractor: the archive for streaming a
    /// sheet part, the shared strings for resolving `t="s"` values.
    pub(crate) fn archive_and_strings(&mut self) -> Result<(&mut ZipArchive<R>, &[String])> {
        if self.shared_strings.is_none() {
            self.shared_strings = Some(extract_shared_strings(&mut self.archive)?);
        }
        let strings = self.shared_strings.as_deref().unwrap_or(&[]);
        Ok((&mut self.archive, strings))
    }
}

pub(crate) fn xml_err(part: &str, err: impl std::fmt::Display) -> Error {
    Error::Extraction {
        part: part.to_string(),
        message: err.to_string(),
    }
}

/// Load the shared-string table, concatenating rich-text runs per entry.
fn extract_shared_strings<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let ss_xml = match archive.by_name(SHARED_STRINGS_PART) {
        Ok(file) => file,
        // A package without shared strings is valid; any other archive
        // failure is not.
        Err(zip::result::ZipError::FileNotFound) => return Ok(strings),
        Err(err) => return Err(err.into()),
    };

    let mut reader = Reader::from_reader(BufReader::new(ss_xml));
    let mut buf = Vec::new();
    let mut current = String::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_err(SHARED_STRINGS_PART, e))?
        {
            Event::Start(e) if e.name().as_ref() == b"t" => {
                let text =
                    read_text_node(&mut reader).map_err(|e| xml_err(SHARED_STRINGS_PART, e))?;
                current.push_str(&text);
            }
            Event::End(e) if e.name().as_ref() == b"si" => {
                strings.push(current.clone());
                current.clear();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Read the text content of the current node, up to its end tag.
pub(crate) fn read_text_node<B: std::io::BufRead>(
    reader: &mut Reader<B>,
) -> std::result::Result<String, quick_xml::Error> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(e.unescape()?.as_ref()),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn mock_archive(shared_strings: Option<&str>) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?><workbook><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        )
        .unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?><Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
        )
        .unwrap();

        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(br#"<worksheet><sheetData/></worksheet>"#)
            .unwrap();

        if let Some(sst) = shared_strings {
            zip.start_file("xl/sharedStrings.xml", options).unwrap();
            zip.write_all(sst.as_bytes()).unwrap();
        }

        let cursor = zip.finish().unwrap();
        Cursor::new(cursor.into_inner())
    }

    #[test]
    fn test_open_resolves_sheet_map() {
        let mut package = XlsxPackage::open(mock_archive(None)).unwrap();
        assert_eq!(package.sheet_names(), ["Data".to_string()]);
        assert_eq!(package.sheet_part("Data").unwrap(), "xl/worksheets/sheet1.xml");
        assert!(matches!(
            package.sheet_part("Nope"),
            Err(Error::Resolution(_))
        ));
        let names = package.entry_names().unwrap();
        assert_eq!(names[0], "xl/workbook.xml");
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_read_entry_missing_is_archive_error() {
        let mut package = XlsxPackage::open(mock_archive(None)).unwrap();
        assert!(matches!(
            package.read_entry("xl/styles.xml"),
            Err(Error::Archive(_))
        ));
    }

    #[test]
    fn test_shared_strings_rich_text_runs() {
        let sst = r#"<sst count="3" uniqueCount="3"><si><t>plain</t></si><si><r><t>rich </t></r><r><t>text</t></r></si><si><t>a&amp;b</t></si></sst>"#;
        let mut package = XlsxPackage::open(mock_archive(Some(sst))).unwrap();
        let strings = package.shared_strings().unwrap();
        assert_eq!(strings, ["plain", "rich text", "a&b"]);
    }

    #[test]
    fn test_missing_shared_strings_is_empty_table() {
        let mut package = XlsxPackage::open(mock_archive(None)).unwrap();
        assert!(package.shared_strings().unwrap().is_empty());
    }

    #[test]
    fn test_not_a_zip_is_archive_error() {
        let result = XlsxPackage::open(Cursor::new(b"not a zip".to_vec()));
        assert!(matches!(result, Err(Error::Archive(_))));
    }
}

//! xlate-core: Selective translation patching for OOXML spreadsheets
//!
//! This library extracts translatable cell text from `.xlsx`-family
//! packages, sends it through a pluggable translation provider, and
//! patches only the affected worksheet parts back into the container.
//! Every untouched byte of the package survives verbatim.

pub mod cell;
pub mod config;
pub mod error;
pub mod patch;
pub mod reader;
pub mod report;
pub mod translate;
pub mod writer;

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub use cell::Cell;
pub use config::RunConfig;
pub use error::{Error, Result};
pub use reader::XlsxPackage;
pub use reader::extractor::CellExtractor;
pub use report::{CellMiss, FaultKind, RunReport, SheetFault};
#[cfg(feature = "http-provider")]
pub use translate::HttpTranslator;
pub use translate::{TranslationBatch, Translator};

/// Per-run knobs for [`translate_workbook`].
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub target_lang: String,
    pub source_lang: Option<String>,
    /// Domain hint forwarded to the provider with every batch.
    pub context: Option<String>,
    /// Restrict the run to these sheet names; `None` means all sheets.
    pub sheets: Option<HashSet<String>>,
    pub batch_size: usize,
    pub max_cells: usize,
}

impl TranslateOptions {
    pub fn new(target_lang: &str) -> Self {
        let defaults = RunConfig::default();
        Self {
            target_lang: target_lang.to_string(),
            source_lang: None,
            context: None,
            sheets: None,
            batch_size: defaults.batch_size,
            max_cells: defaults.max_cells,
        }
    }
}

/// Scan a package for translatable cells without translating anything.
///
/// Used by dry runs; sheets that cannot be resolved or read come back
/// as faults alongside the cells of the sheets that could.
pub fn extract_candidates<P: AsRef<Path>>(
    input: P,
    sheets: Option<&HashSet<String>>,
) -> Result<(Vec<Cell>, Vec<SheetFault>)> {
    let mut package = XlsxPackage::open_path(input)?;
    let (cells, failed) = CellExtractor::new(&mut package).extract_cells(sheets);
    let faults = failed
        .iter()
        .map(|(name, err)| SheetFault::from_error(name, err))
        .collect();
    Ok((cells, faults))
}

/// Translate a workbook's text cells and write the patched package.
///
/// The run proceeds open, extract, translate, patch, write. Per-sheet
/// failures at any stage are isolated as report faults and leave that
/// sheet's part untouched. Archive errors, the `max_cells` admission
/// limit, and provider failures abort the run before any output file
/// exists. The output is always written on success, byte-identical to
/// the input wherever no cell changed.
pub fn translate_workbook<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    translator: &dyn Translator,
    options: &TranslateOptions,
) -> Result<RunReport> {
    let input = input.as_ref();
    let mut package = XlsxPackage::open_path(input)?;
    let mut report = RunReport::default();

    let (cells, failed) = CellExtractor::new(&mut package).extract_cells(options.sheets.as_ref());
    for (name, err) in &failed {
        report.faults.push(SheetFault::from_error(name, err));
    }
    report.cells_found = cells.len();

    if cells.len() > options.max_cells {
        return Err(Error::Translation(format!(
            "found {} translatable cells, admission limit is {}",
            cells.len(),
            options.max_cells
        )));
    }

    let texts: Vec<String> = cells.iter().map(|c| c.value.clone()).collect();
    let translations = translate::translate_in_batches(
        translator,
        &texts,
        options.batch_size,
        options.source_lang.as_deref(),
        &options.target_lang,
        options.context.as_deref(),
    )?;

    // Group updates per sheet, keyed by cell position.
    let mut updates: HashMap<String, HashMap<(u32, u32), String>> = HashMap::new();
    for (cell, translation) in cells.into_iter().zip(translations) {
        updates
            .entry(cell.sheet)
            .or_default()
            .insert((cell.row, cell.col), translation);
    }

    // Resolve each updated sheet to its part and pull the part bytes
    // while the package is still open.
    let mut jobs = Vec::with_capacity(updates.len());
    for name in package.sheet_names().to_vec() {
        let Some(sheet_updates) = updates.remove(&name) else {
            continue;
        };
        let part = match package.sheet_part(&name) {
            Ok(part) => part.to_string(),
            Err(err) => {
                report.faults.push(SheetFault::from_error(&name, &err));
                continue;
            }
        };
        match package.read_entry(&part) {
            Ok(bytes) => jobs.push((name, part, bytes, sheet_updates)),
            Err(err) => report.faults.push(SheetFault::from_error(&name, &err)),
        }
    }
    drop(package);

    let results: Vec<(String, String, Result<patch::PatchOutcome>)> = jobs
        .into_par_iter()
        .map(|(name, part, bytes, sheet_updates)| {
            let outcome = patch::patch_sheet_xml(&part, &bytes, &sheet_updates);
            (name, part, outcome)
        })
        .collect();

    let mut replacements = HashMap::new();
    for (name, part, result) in results {
        match result {
            Ok(outcome) => {
                report.cells_translated += outcome.applied;
                for reference in outcome.misses {
                    report.misses.push(CellMiss {
                        sheet: name.clone(),
                        reference,
                    });
                }
                if outcome.applied > 0 {
                    replacements.insert(part, outcome.xml);
                    report.sheets_modified += 1;
                }
            }
            Err(err) => report.faults.push(SheetFault::from_error(&name, &err)),
        }
    }

    writer::write_package(input, output.as_ref(), &replacements)?;
    Ok(report)
}

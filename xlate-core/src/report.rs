//! Per-run report consumed by callers and CLIs

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Which stage a per-sheet fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    Resolution,
    Extraction,
    Patch,
}

/// A non-fatal failure scoped to a single sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetFault {
    pub sheet: String,
    pub kind: FaultKind,
    pub message: String,
}

impl SheetFault {
    pub fn from_error(sheet: &str, err: &Error) -> Self {
        let kind = match err {
            Error::Resolution(_) => FaultKind::Resolution,
            Error::Extraction { .. } => FaultKind::Extraction,
            Error::Patch { .. } => FaultKind::Patch,
            // Archive and translation errors are fatal and never become
            // sheet faults; keep a sensible mapping anyway.
            Error::Archive(_) | Error::Translation(_) => FaultKind::Extraction,
        };
        SheetFault {
            sheet: sheet.to_string(),
            kind,
            message: err.to_string(),
        }
    }
}

/// An update coordinate that matched no cell in its sheet part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMiss {
    pub sheet: String,
    pub reference: String,
}

/// Outcome of one translation run.
///
/// Every non-fatal problem ends up here: unresolved or unreadable
/// sheets in `faults`, update coordinates that matched nothing in
/// `misses`. A run that returns a report produced an output file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Translatable cells found by the extraction pass.
    pub cells_found: usize,
    /// Cells whose value node was actually rewritten.
    pub cells_translated: usize,
    /// Sheet parts that were replaced in the output package.
    pub sheets_modified: usize,
    pub misses: Vec<CellMiss>,
    pub faults: Vec<SheetFault>,
}

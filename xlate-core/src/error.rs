//! Error types for the translation pipeline

use thiserror::Error;

/// Errors produced while reading, patching, or writing a workbook package.
///
/// Archive and translation errors are fatal for a run; resolution,
/// extraction, and patch errors are scoped to a single sheet and are
/// collected into the run report instead of aborting the other sheets.
#[derive(Debug, Error)]
pub enum Error {
    /// The package cannot be opened, read, or written as a zip container.
    #[error("package archive error: {0}")]
    Archive(String),

    /// A sheet name has no matching worksheet part in the package.
    #[error("sheet '{0}' does not resolve to a worksheet part")]
    Resolution(String),

    /// A sheet part's XML is malformed during the extraction scan.
    #[error("failed to scan '{part}': {message}")]
    Extraction { part: String, message: String },

    /// A sheet part's XML is malformed during the patch pass.
    #[error("failed to patch '{part}': {message}")]
    Patch { part: String, message: String },

    /// The translation provider failed or broke the count invariant.
    #[error("translation provider error: {0}")]
    Translation(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Archive(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

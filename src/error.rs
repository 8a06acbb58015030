use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning an uploaded file into [`ParsedSheet`]s.
///
/// [`ParsedSheet`]: crate::workbook::ParsedSheet
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported file format '{extension}' (expected xlsx, xls, or csv)")]
    UnsupportedFormat { extension: String },

    #[error("File is {size} bytes, exceeding the {limit} byte upload limit")]
    TooLarge { size: usize, limit: usize },

    #[error("No sheet in the file contains any data rows")]
    Empty,

    #[error("Failed to read workbook: {0}")]
    Workbook(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to decode text with encoding {encoding}")]
    Decode { encoding: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sheet-fatal import failures. Row-level outcomes are reported inside
/// [`ImportResult`] instead; only conditions that abort before or during the
/// insert phase surface here.
///
/// [`ImportResult`]: crate::import::ImportResult
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Caller is not authenticated against the record store")]
    Unauthenticated,

    #[error("Caller lacks write permission on scope {scope}")]
    Forbidden { scope: String },

    #[error("Replace-mode delete failed for table '{table}': {source}")]
    ReplaceDeleteFailed {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("Sheet routed to 'unknown' cannot be imported")]
    UnroutableSheet,

    #[error("Reading existing records for deduplication failed: {0}")]
    ExistingFetchFailed(#[source] StoreError),
}

/// Failures reported by the record-store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store rejected the credentials")]
    Unauthenticated,

    #[error("Write permission denied on scope")]
    PermissionDenied,

    #[error("Store operation failed: {0}")]
    Backend(String),

    #[error(
        "Insert reported success but persisted zero rows; writes are likely \
         blocked silently by an authorization policy"
    )]
    PersistenceSilentlyBlocked,

    #[error("Store file {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for the table engine.

/// All errors that can surface from the engine and its collaborators.
///
/// Windowing and reducer faults never produce an error: unknown keys and
/// schema drift are absorbed as no-ops. Only request-level failures and
/// I/O reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// A provider rejected the request.
    #[error("provider failed: {0}")]
    Provider(String),

    /// The request was superseded and aborted. Never shown to users.
    #[error("request aborted")]
    Aborted,

    /// Spreadsheet writer failure.
    #[error("XLSX write error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    /// File system failure (template store, config, export target).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a dataset, template file or config file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    Config(String),
}

impl TableError {
    /// Returns true for the cancellation signal that must be swallowed.
    pub fn is_aborted(&self) -> bool {
        matches!(self, TableError::Aborted)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TableError>;

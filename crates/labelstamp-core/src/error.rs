use thiserror::Error;

/// Run-level failures. Per-row grammar misses and per-page lookup misses are
/// recovered locally and never reach this enum.
#[derive(Error, Debug)]
pub enum StampError {
    #[error("One or both input documents were not supplied")]
    MissingInput,

    #[error("No shipment records could be extracted from the orders document")]
    NoRecordsExtracted,

    #[error("No label page matched a shipment number from the orders document")]
    NoMatchesFound,

    #[error("Annotation font is unavailable: {0}")]
    FontUnavailable(String),

    #[error("Failed to parse document: {0}")]
    MalformedDocument(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}

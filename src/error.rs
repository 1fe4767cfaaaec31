//! Error taxonomy for the scrape pipeline.
//!
//! Three failure classes flow out of a request: a bad request parameter,
//! a browser/navigation failure, and a parse failure on malformed markup.
//! Zero extraction results are NOT an error — extractors return documented
//! defaults instead. The route boundary maps each variant to a status code.

use thiserror::Error;

/// Errors that can occur while serving a scrape request.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A required request parameter is missing or empty.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Browser launch, navigation, or wait failure.
    #[error("render failed: {0}")]
    Render(String),

    /// The parser itself failed on malformed markup.
    #[error("extraction failed: {0}")]
    Extraction(String),
}

/// Result type alias for scrape operations.
pub type ScrapeResult<T> = Result<T, ScrapeError>;

use thiserror::Error;

/// Malformed `$filter` / `$orderby` / `$top` input.
///
/// Surfaces as HTTP 400 at the API boundary; the position is a byte offset
/// into the offending parameter string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid query syntax at offset {position}: {message}")]
pub struct QuerySyntaxError {
    pub message: String,
    pub position: usize,
}

impl QuerySyntaxError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

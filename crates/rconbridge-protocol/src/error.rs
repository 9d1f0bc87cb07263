//! Error types for the protocol layer.

/// Errors that can occur while parsing protocol values.
///
/// Every crate in the workspace has its own error enum, so a
/// `ProtocolError` always means "this text could not be understood",
/// never "the network failed".
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A snowflake id could not be parsed from text.
    #[error("invalid id: {0:?}")]
    InvalidId(String),

    /// A line of remote-console output did not have the expected shape.
    #[error("invalid record: {0:?}")]
    InvalidRecord(String),
}

//! Error types for dashboard protocol records.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while interpreting server replies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A required struct member is absent or nil.
    #[error("{record} record is missing field {field:?}")]
    MissingField {
        /// Record being decoded.
        record: &'static str,
        /// Name of the missing member.
        field: &'static str,
    },

    /// A struct member has the wrong XML-RPC type.
    #[error("{record} field {field:?} should be {expected}, got {actual}")]
    WrongType {
        /// Record being decoded.
        record: &'static str,
        /// Name of the offending member.
        field: &'static str,
        /// Expected XML-RPC type.
        expected: &'static str,
        /// XML-RPC type received.
        actual: &'static str,
    },

    /// The reply is not shaped like the method's contract.
    #[error("unexpected reply to {method}: {message}")]
    UnexpectedReply {
        /// Remote method name.
        method: &'static str,
        /// What was wrong.
        message: String,
    },

    /// A version string does not follow the expected layout.
    #[error("{0}")]
    VersionFormat(String),
}

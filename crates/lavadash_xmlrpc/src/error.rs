//! Error types for the XML-RPC codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding XML-RPC documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The document is not well-formed XML.
    #[error("malformed XML: {message}")]
    MalformedXml {
        /// Parser diagnostic.
        message: String,
    },

    /// The XML is well-formed but not a valid XML-RPC document.
    #[error("invalid XML-RPC structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// A scalar could not be parsed as its declared type.
    #[error("invalid <{type_name}> value: {text:?}")]
    InvalidScalar {
        /// Element name of the scalar (`int`, `double`, ...).
        type_name: String,
        /// Raw text of the element.
        text: String,
    },

    /// The value uses a type this client does not understand.
    #[error("unsupported XML-RPC type: {type_name}")]
    UnsupportedType {
        /// Element name of the unsupported type.
        type_name: String,
    },

    /// Integer does not fit the 32-bit XML-RPC `int`.
    #[error("integer {0} does not fit in a 32-bit XML-RPC int")]
    IntegerOverflow(i64),
}

impl CodecError {
    /// Create a malformed XML error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedXml {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an invalid scalar error.
    pub fn invalid_scalar(type_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::InvalidScalar {
            type_name: type_name.into(),
            text: text.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }
}

//! Error types for the dashboard engine.

use lavadash_protocol::ProtocolError;
use lavadash_xmlrpc::CodecError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fault code the dashboard uses for a missing stream or bundle.
pub const FAULT_NOT_FOUND: i32 = 404;
/// Fault code the dashboard uses for an already existing stream or bundle.
pub const FAULT_DUPLICATE: i32 = 409;
/// Fault code the dashboard uses for an internal server error.
pub const FAULT_INTERNAL: i32 = 500;

/// Low-level cause of a [`EngineError::Network`] failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    /// The server actively refused the connection.
    ConnectionRefused,
    /// The host name could not be resolved.
    Unresolved,
    /// Any other socket-level failure.
    Other,
}

/// Errors that can occur while talking to a dashboard.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input from the user.
    #[error("{0}")]
    Usage(String),

    /// The endpoint names a user but no token could be found.
    #[error("Username {username} provided but no token found for {host}")]
    AuthMissing {
        /// User named in the endpoint.
        username: String,
        /// Host key used for the lookup.
        host: String,
    },

    /// The server answered 401 while validating a token.
    #[error("Token rejected by server for user {username}.")]
    AuthRejected {
        /// User whose token was rejected.
        username: String,
    },

    /// The request never reached the server.
    #[error("unable to connect to server at {url}: {message}")]
    Network {
        /// Endpoint that was contacted, without credentials.
        url: String,
        /// Classified cause.
        kind: NetworkFailure,
        /// Message from the transport.
        message: String,
    },

    /// The server answered with a non-200 HTTP status.
    #[error("HTTP error code: {status}/{reason}")]
    Http {
        /// Endpoint that was contacted, without credentials.
        url: String,
        /// HTTP status code.
        status: u16,
        /// HTTP reason phrase.
        reason: String,
    },

    /// The server answered with an XML-RPC fault.
    #[error("XML-RPC error {code}: {message}")]
    Fault {
        /// `faultCode`.
        code: i32,
        /// `faultString`.
        message: String,
    },

    /// The server is older than the command requires.
    #[error("This command requires at least server version {required}, actual server version is {server}")]
    InsufficientServerVersion {
        /// Normalized server version.
        server: String,
        /// Required minimum.
        required: String,
    },

    /// The server reported a version string that cannot be interpreted.
    #[error("{0}")]
    VersionFormat(String),

    /// A backup tree entry could not be read or written.
    #[error("backup entry {path}: {source}")]
    Backup {
        /// Offending path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// A backup tree metadata file is not valid JSON.
    #[error("backup metadata {path}: {source}")]
    BackupMetadata {
        /// Offending path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: serde_json::Error,
    },

    /// A server-supplied bundle SHA-1 cannot name a backup file.
    #[error("invalid bundle SHA-1 {sha1:?}: expected 40 lowercase hex digits")]
    InvalidSha1 {
        /// Value received.
        sha1: String,
    },

    /// Local I/O error outside a backup tree.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML-RPC document.
    #[error("invalid XML-RPC message: {0}")]
    Codec(#[from] CodecError),

    /// Well-formed reply of the wrong shape.
    #[error("{0}")]
    Protocol(ProtocolError),

    /// The OS credential store failed.
    #[error("credential store error: {0}")]
    Credential(String),

    /// A command failed in a way the user can act on.
    #[error("{0}")]
    Command(String),

    /// An invariant of the client or server was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Creates a user-visible command error.
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    /// Returns the fault code if this is an XML-RPC fault.
    pub fn fault_code(&self) -> Option<i32> {
        match self {
            EngineError::Fault { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for a fault reporting a duplicate stream or bundle.
    pub fn is_duplicate(&self) -> bool {
        self.fault_code() == Some(FAULT_DUPLICATE)
    }

    /// Returns true for a fault reporting a missing stream or bundle.
    pub fn is_not_found(&self) -> bool {
        self.fault_code() == Some(FAULT_NOT_FOUND)
    }
}

impl From<ProtocolError> for EngineError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::VersionFormat(message) => EngineError::VersionFormat(message),
            other => EngineError::Protocol(other),
        }
    }
}

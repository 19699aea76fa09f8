use std::path::PathBuf;
use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;

/// Crate-wide `Result` type using [`MongoportError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, MongoportError>;

/// Top-level error type for mongoport operations.
#[derive(Debug)]
pub enum MongoportError {
    /// Connection-related errors.
    Connection(ConnectionError),

    /// A file-based source directory does not exist.
    SourceNotFound(PathBuf),

    /// A transfer step failed mid-way. Wraps the underlying cause.
    Transfer(TransferFailure),

    /// Record or sidecar encoding errors.
    Codec(CodecError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection (rejected by the server or the driver).
    ConnectionFailed(String),

    /// Server selection did not complete within the configured timeout.
    Timeout,

    /// Invalid or empty connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,
}

/// Step of a transfer at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    ListCollections,
    ReadDocuments,
    InsertBatch,
    ReadIndexes,
    CreateIndexes,
    WriteRecords,
    WriteIndexes,
}

/// A failed transfer step, with the collection it happened in.
#[derive(Debug)]
pub struct TransferFailure {
    /// Collection being transferred, `None` when the failure precedes any collection.
    pub collection: Option<String>,
    pub step: TransferStep,
    pub cause: Box<MongoportError>,
}

/// Record file and index sidecar encoding errors.
#[derive(Debug)]
pub enum CodecError {
    /// A record line is not a valid extended-JSON document.
    MalformedRecord { line: usize, message: String },

    /// A document could not be encoded as extended JSON.
    Encode(String),

    /// The index sidecar is not a JSON array of documents.
    MalformedSidecar { path: PathBuf, message: String },

    /// A record file name does not map to a valid collection name.
    InvalidCollectionName(String),

    /// An index descriptor cannot be turned into an index model.
    InvalidIndex { name: String, message: String },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

impl TransferFailure {
    pub fn new(collection: Option<&str>, step: TransferStep, cause: MongoportError) -> Self {
        Self {
            collection: collection.map(str::to_string),
            step,
            cause: Box::new(cause),
        }
    }
}

impl MongoportError {
    /// Wrap this error as a failure of `step` while transferring `collection`.
    ///
    /// Errors that already carry transfer context are returned unchanged.
    pub fn during(self, collection: Option<&str>, step: TransferStep) -> Self {
        match self {
            MongoportError::Transfer(_) | MongoportError::SourceNotFound(_) => self,
            other => MongoportError::Transfer(TransferFailure::new(collection, step, other)),
        }
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, MongoportError::Connection(ConnectionError::NotConnected))
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for MongoportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MongoportError::Connection(e) => write!(f, "Connection error: {e}"),
            MongoportError::SourceNotFound(path) => {
                write!(f, "Source directory not found: {}", path.display())
            }
            MongoportError::Transfer(e) => write!(f, "Transfer failed: {e}"),
            MongoportError::Codec(e) => write!(f, "Codec error: {e}"),
            MongoportError::Config(e) => write!(f, "Configuration error: {e}"),
            MongoportError::Io(e) => write!(f, "I/O error: {e}"),
            MongoportError::MongoDb(e) => format_mongodb_error(f, e),
            MongoportError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::Timeout => write!(f, "Connection timeout"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
        }
    }
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            TransferStep::ListCollections => "listing collections",
            TransferStep::ReadDocuments => "reading documents",
            TransferStep::InsertBatch => "inserting batch",
            TransferStep::ReadIndexes => "reading indexes",
            TransferStep::CreateIndexes => "creating indexes",
            TransferStep::WriteRecords => "writing records",
            TransferStep::WriteIndexes => "writing index sidecar",
        };
        f.write_str(step)
    }
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection {
            Some(name) => write!(f, "{} in collection '{name}': {}", self.step, self.cause),
            None => write!(f, "{}: {}", self.step, self.cause),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MalformedRecord { line, message } => {
                write!(f, "Malformed record on line {line}: {message}")
            }
            CodecError::Encode(msg) => write!(f, "Failed to encode document: {msg}"),
            CodecError::MalformedSidecar { path, message } => {
                write!(f, "Malformed index file {}: {message}", path.display())
            }
            CodecError::InvalidCollectionName(name) => {
                write!(f, "Invalid collection name: {name}")
            }
            CodecError::InvalidIndex { name, message } => {
                write!(f, "Invalid index '{name}': {message}")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for MongoportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MongoportError::Transfer(e) => Some(e),
            MongoportError::Io(e) => Some(e),
            MongoportError::MongoDb(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for TransferFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

impl std::error::Error for ConnectionError {}
impl std::error::Error for CodecError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to MongoportError ========================= */

impl From<io::Error> for MongoportError {
    fn from(err: io::Error) -> Self {
        MongoportError::Io(err)
    }
}

impl From<mongodb::error::Error> for MongoportError {
    fn from(err: mongodb::error::Error) -> Self {
        MongoportError::MongoDb(err)
    }
}

impl From<ConnectionError> for MongoportError {
    fn from(err: ConnectionError) -> Self {
        MongoportError::Connection(err)
    }
}

impl From<TransferFailure> for MongoportError {
    fn from(err: TransferFailure) -> Self {
        MongoportError::Transfer(err)
    }
}

impl From<CodecError> for MongoportError {
    fn from(err: CodecError) -> Self {
        MongoportError::Codec(err)
    }
}

impl From<ConfigError> for MongoportError {
    fn from(err: ConfigError) -> Self {
        MongoportError::Config(err)
    }
}

impl From<serde_json::Error> for MongoportError {
    fn from(err: serde_json::Error) -> Self {
        MongoportError::Codec(CodecError::Encode(err.to_string()))
    }
}

impl From<toml::de::Error> for MongoportError {
    fn from(err: toml::de::Error) -> Self {
        MongoportError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<toml::ser::Error> for MongoportError {
    fn from(err: toml::ser::Error) -> Self {
        MongoportError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<String> for MongoportError {
    fn from(msg: String) -> Self {
        MongoportError::Generic(msg)
    }
}

impl From<&str> for MongoportError {
    fn from(msg: &str) -> Self {
        MongoportError::Generic(msg.to_owned())
    }
}

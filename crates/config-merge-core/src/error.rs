//! Error types and handling for config-merge runs

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for a merge run
#[derive(Debug, Error)]
pub enum ConfigMergeError {
    /// Invalid flag value or argument
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("File does not exist: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid file extension: {}", .path.display())]
    UnrecognizedExtension { path: PathBuf },

    /// Malformed source text for the given format
    #[error("Parse error ({format}): {message}")]
    ParseError { format: String, message: String },

    #[error("Malformed patch document: {message}")]
    MalformedPatchDocument { message: String },

    #[error(transparent)]
    Patch(#[from] PatchError),

    /// The shell used to source an env file could not be run or failed
    #[error("Failed to source '{}': {message}", .path.display())]
    EnvSourceFailed { path: PathBuf, message: String },

    #[error("Substitution error: {message}")]
    SubstitutionError { message: String },

    #[error("Serialization error ({format}): {message}")]
    SerializationError { format: String, message: String },

    /// File system I/O errors
    #[error("IO error for path '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any error raised while processing a single input file
    #[error("Error when processing file '{}': {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<ConfigMergeError>,
    },
}

/// Errors raised by individual JSON Patch operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("path not found: '{path}'")]
    PathNotFound { path: String },

    #[error("test failed at '{path}': expected {expected}, found {actual}")]
    TestFailed {
        path: String,
        expected: Value,
        actual: Value,
    },

    #[error("cannot move '{from}' into its own descendant '{path}'")]
    InvalidMove { from: String, path: String },

    #[error("invalid JSON pointer: '{pointer}'")]
    InvalidPointer { pointer: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    FileNotFound,
    UnrecognizedExtension,
    Parse,
    MalformedPatch,
    Patch,
    EnvSource,
    Substitution,
    Serialization,
    Io,
}

impl ConfigMergeError {
    /// Get the error kind for this error, looking through file context
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigMergeError::ConfigError { .. } => ErrorKind::Config,
            ConfigMergeError::FileNotFound { .. } => ErrorKind::FileNotFound,
            ConfigMergeError::UnrecognizedExtension { .. } => ErrorKind::UnrecognizedExtension,
            ConfigMergeError::ParseError { .. } => ErrorKind::Parse,
            ConfigMergeError::MalformedPatchDocument { .. } => ErrorKind::MalformedPatch,
            ConfigMergeError::Patch(_) => ErrorKind::Patch,
            ConfigMergeError::EnvSourceFailed { .. } => ErrorKind::EnvSource,
            ConfigMergeError::SubstitutionError { .. } => ErrorKind::Substitution,
            ConfigMergeError::SerializationError { .. } => ErrorKind::Serialization,
            ConfigMergeError::IoError { .. } => ErrorKind::Io,
            ConfigMergeError::File { source, .. } => source.kind(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a parse error for the named format
    pub fn parse_error(format: impl Into<String>, message: impl ToString) -> Self {
        Self::ParseError {
            format: format.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed_patch(message: impl Into<String>) -> Self {
        Self::MalformedPatchDocument {
            message: message.into(),
        }
    }

    pub fn substitution_error(message: impl Into<String>) -> Self {
        Self::SubstitutionError {
            message: message.into(),
        }
    }

    pub fn serialization_error(format: impl Into<String>, message: impl ToString) -> Self {
        Self::SerializationError {
            format: format.into(),
            message: message.to_string(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Attach the path of the file being processed
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ ConfigMergeError::File { .. } => already,
            other => Self::File {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

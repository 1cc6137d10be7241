//! Error types for request construction and resource access

use thiserror::Error;

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or writing an upload request
#[derive(Debug, Error)]
pub enum Error {
    /// A form field could not be turned into multipart text
    #[error("Parameter `{field}` cannot be serialized: {message}")]
    ParameterSerialization {
        /// Offending field name, empty when the whole parameter set is malformed
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// A file descriptor could not be resolved to a readable resource
    #[error("Failed to resolve file `{name}` for key `{key}`: {source}")]
    FileResolution {
        /// Form field name of the file
        key: String,
        /// Path or URI the caller supplied
        name: String,
        /// Underlying resource failure
        #[source]
        source: ResourceError,
    },

    /// Header text that cannot be placed on the wire as-is
    #[error("Cannot encode {what} `{value}` into a multipart header")]
    Encoding {
        /// Which piece of header text was rejected
        what: &'static str,
        /// The rejected text
        value: String,
    },

    /// A file descriptor record did not deserialize
    #[error("Invalid file descriptor at index {index}: {source}")]
    InvalidDescriptor {
        /// Position in the descriptor list
        index: usize,
        /// Deserialization failure
        #[source]
        source: serde_json::Error,
    },

    /// The reserved `headers` field does not describe valid HTTP headers
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A transport helper produced a different number of bytes than declared
    #[error("Body length mismatch: declared {declared} bytes, produced {actual}")]
    LengthMismatch {
        /// Content length computed at construction
        declared: u64,
        /// Bytes actually produced
        actual: u64,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a [`ResourceApi`](crate::ResourceApi)
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The name could not be turned into a locator
    #[error("Invalid locator `{0}`")]
    InvalidLocator(String),

    /// No handler for this URL scheme
    #[error("Unsupported scheme `{0}`")]
    UnsupportedScheme(String),

    /// Nothing exists at the locator
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The resource exists but could not be opened or stat'ed
    #[error("Resource unreadable: {0}")]
    Unreadable(#[source] std::io::Error),

    /// Inline resource payload is malformed
    #[error("Invalid resource data: {0}")]
    InvalidData(String),
}

impl ResourceError {
    /// Map an I/O failure, keeping "not found" distinct from other read errors
    pub(crate) fn from_io(locator: &url::Url, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            ResourceError::NotFound(locator.to_string())
        } else {
            ResourceError::Unreadable(error)
        }
    }
}

impl Error {
    /// Whether this error came from resolving a file part
    pub fn is_file_resolution(&self) -> bool {
        matches!(self, Error::FileResolution { .. })
    }
}

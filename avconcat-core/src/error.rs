//! Error types reported by item readers.
//!
//! Everything that opens, reads or seeks a single media item speaks this
//! error type. The playlist layer wraps it with item context.

use thiserror::Error;

/// Error raised by an item reader.
#[derive(Error, Debug)]
pub enum Error {
    /// Container format errors (probing, demuxing).
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unsupported feature or operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// End of stream reached.
    #[error("End of stream")]
    EndOfStream,
}

/// Container format errors.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The item could not be recognized as any known format.
    #[error("Unknown container format")]
    UnknownFormat,

    /// Invalid or corrupted container structure.
    #[error("Invalid container structure: {0}")]
    InvalidStructure(String),

    /// No decoder could be opened for a stream.
    #[error("Codec open failed for stream {index}: {message}")]
    CodecOpen { index: usize, message: String },

    /// Stream not found in container.
    #[error("Stream {index} not found")]
    StreamNotFound { index: usize },

    /// Seek operation failed.
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    /// Generic container error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for ContainerError {
    fn from(s: String) -> Self {
        ContainerError::Other(s)
    }
}

impl From<&str> for ContainerError {
    fn from(s: &str) -> Self {
        ContainerError::Other(s.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }

    /// Check if this error reports a missing capability rather than a failure.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameter("negative stream index".into());
        assert_eq!(err.to_string(), "Invalid parameter: negative stream index");
    }

    #[test]
    fn test_container_error_conversion() {
        let err: Error = ContainerError::UnknownFormat.into();
        assert!(matches!(err, Error::Container(ContainerError::UnknownFormat)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.mp4");
        let err: Error = io.into();
        assert!(err.to_string().contains("missing.mp4"));
    }

    #[test]
    fn test_predicates() {
        assert!(Error::EndOfStream.is_eof());
        assert!(!Error::unsupported("seek").is_eof());
        assert!(Error::unsupported("seek").is_unsupported());
        assert!(!Error::EndOfStream.is_unsupported());
    }
}

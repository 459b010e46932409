//! Errors reported by the playlist engine.

use avconcat_core::Error;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors specific to playlist traversal and seeking.
///
/// Reader errors are shared behind an `Arc` so a failed engine can hand the
/// same error back on every later call.
#[derive(Error, Debug, Clone)]
pub enum PlaylistError {
    /// Opening or probing an item failed.
    #[error("Failed to open playlist item {index} ({}): {source}", .path.display())]
    ItemOpen {
        index: usize,
        path: PathBuf,
        #[source]
        source: Arc<Error>,
    },

    /// The item reader failed with something other than a clean end of stream.
    #[error("Read error in playlist item {index}: {source}")]
    Read {
        index: usize,
        #[source]
        source: Arc<Error>,
    },

    /// The seek target lies past every item's end.
    #[error("Seek target {target_us}us is beyond the end of the playlist ({known_us}us)")]
    SeekBeyondEnd { target_us: i64, known_us: i64 },

    /// The item reader cannot seek.
    #[error("Playlist item {index} does not support seeking")]
    SeekUnsupported {
        index: usize,
        #[source]
        source: Option<Arc<Error>>,
    },

    /// The item reader failed to seek.
    #[error("Seek failed in playlist item {index}: {source}")]
    Seek {
        index: usize,
        #[source]
        source: Arc<Error>,
    },

    /// A catalog position is out of range.
    #[error("Playlist index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// No items in the playlist.
    #[error("Playlist is empty")]
    PlaylistEmpty,

    /// A global stream index does not map to any opened item.
    #[error("Global stream {index} not found")]
    StreamNotFound { index: usize },

    /// The item entered by an automatic switch produced no packet.
    ///
    /// The cursor has already moved past the finished item; calling again
    /// continues with the next switch.
    #[error("Playlist item {index} ended immediately after switching to it")]
    EmptyItem { index: usize },

    /// The item currently being streamed cannot be removed.
    #[error("Playlist item {index} is being streamed")]
    ActiveItem { index: usize },

    /// The engine was closed.
    #[error("Playlist is closed")]
    Closed,
}

/// Result type alias for playlist operations.
pub type Result<T> = std::result::Result<T, PlaylistError>;

impl PlaylistError {
    pub(crate) fn item_open(index: usize, path: impl Into<PathBuf>, source: Error) -> Self {
        PlaylistError::ItemOpen {
            index,
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn read(index: usize, source: Error) -> Self {
        PlaylistError::Read {
            index,
            source: Arc::new(source),
        }
    }

    /// Map a reader's seek failure, keeping "cannot seek" distinct.
    pub(crate) fn seek(index: usize, source: Error) -> Self {
        if source.is_unsupported() {
            PlaylistError::SeekUnsupported {
                index,
                source: Some(Arc::new(source)),
            }
        } else {
            PlaylistError::Seek {
                index,
                source: Arc::new(source),
            }
        }
    }

    /// The playlist item the error is about, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            PlaylistError::ItemOpen { index, .. }
            | PlaylistError::Read { index, .. }
            | PlaylistError::SeekUnsupported { index, .. }
            | PlaylistError::Seek { index, .. }
            | PlaylistError::IndexOutOfRange { index, .. }
            | PlaylistError::EmptyItem { index }
            | PlaylistError::ActiveItem { index } => Some(*index),
            _ => None,
        }
    }

    /// Whether calling the same operation again can make progress.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlaylistError::EmptyItem { .. })
    }
}

impl From<PlaylistError> for Error {
    fn from(e: PlaylistError) -> Self {
        match e {
            PlaylistError::SeekUnsupported { .. } => Error::Unsupported(e.to_string()),
            _ => Error::Container(e.to_string().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avconcat_core::ContainerError;

    #[test]
    fn test_item_open_display() {
        let err = PlaylistError::item_open(
            1,
            "/media/b.mp4",
            Error::Container(ContainerError::UnknownFormat),
        );
        let msg = err.to_string();
        assert!(msg.contains("item 1"));
        assert!(msg.contains("/media/b.mp4"));
        assert_eq!(err.index(), Some(1));
    }

    #[test]
    fn test_seek_unsupported_mapping() {
        let err = PlaylistError::seek(2, Error::unsupported("no index"));
        assert!(matches!(err, PlaylistError::SeekUnsupported { index: 2, .. }));

        let err = PlaylistError::seek(2, Error::invalid_param("bad"));
        assert!(matches!(err, PlaylistError::Seek { index: 2, .. }));
    }

    #[test]
    fn test_clone_shares_source() {
        let err = PlaylistError::read(0, Error::invalid_param("truncated"));
        let copy = err.clone();
        match (err, copy) {
            (PlaylistError::Read { source: a, .. }, PlaylistError::Read { source: b, .. }) => {
                assert!(Arc::ptr_eq(&a, &b));
            }
            _ => panic!("Expected Read variants"),
        }
    }

    #[test]
    fn test_into_core_error() {
        let err: Error = PlaylistError::PlaylistEmpty.into();
        assert!(matches!(err, Error::Container(_)));

        let err: Error = PlaylistError::SeekUnsupported { index: 0, source: None }.into();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_recoverable() {
        assert!(PlaylistError::EmptyItem { index: 3 }.is_recoverable());
        assert!(!PlaylistError::PlaylistEmpty.is_recoverable());
    }
}

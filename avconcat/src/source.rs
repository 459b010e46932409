//! Playlist input: the ordered item paths a playlist is built from.

use crate::config::PlaylistConfig;
use std::path::{Path, PathBuf};

/// Input source for a playlist.
///
/// Parsing playlist file formats happens elsewhere; this only carries the
/// resulting paths and knows how to resolve relative ones.
#[derive(Debug, Clone)]
pub enum PlaylistSource {
    /// Item paths, relative ones resolved against the config base directory.
    Paths(Vec<PathBuf>),
    /// Item paths read from a playlist file; relative ones resolve against
    /// the playlist file's directory.
    PlaylistFile {
        playlist: PathBuf,
        items: Vec<PathBuf>,
    },
}

impl PlaylistSource {
    /// Create from a list of paths.
    pub fn from_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self::Paths(paths.into_iter().map(Into::into).collect())
    }

    /// Create from the entries of a playlist file.
    pub fn from_playlist_file(
        playlist: impl Into<PathBuf>,
        items: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Self {
        Self::PlaylistFile {
            playlist: playlist.into(),
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve every entry to the path the item will be opened from.
    ///
    /// Existence is not checked; a missing file only fails when opened.
    pub fn resolve(&self, config: &PlaylistConfig) -> Vec<PathBuf> {
        match self {
            PlaylistSource::Paths(paths) => paths
                .iter()
                .map(|p| resolve_item_path(p, config.base_dir.as_deref()))
                .collect(),
            PlaylistSource::PlaylistFile { playlist, items } => {
                let base = playlist
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .or(config.base_dir.as_deref());
                items.iter().map(|p| resolve_item_path(p, base)).collect()
            }
        }
    }
}

/// Join a relative item path to `base`; absolute paths pass through.
pub fn resolve_item_path(path: &Path, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

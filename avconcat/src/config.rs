//! Playlist engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How `pts` is filled in for streams that do not reorder frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PtsSynthesis {
    /// A missing `pts` on a stream without B-frames becomes `dts`.
    #[default]
    FromDts,
    /// Every packet of a stream without B-frames gets `pts = dts + 1`.
    ///
    /// Known to skew timing on some codecs; kept for hosts that depend on
    /// the old output.
    LegacyDtsPlusOne,
    /// Leave `pts` untouched.
    Disabled,
}

/// Which duration an item contributes to the global timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// The end of the last packet seen during playback replaces the
    /// container duration once the item finishes.
    #[default]
    Measured,
    /// Always use the container-reported duration.
    Container,
}

/// Configuration for the playlist engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    /// Base directory for resolving relative item paths.
    pub base_dir: Option<PathBuf>,
    /// `pts` synthesis policy.
    pub pts_synthesis: PtsSynthesis,
    /// Duration policy for finished items.
    pub duration_source: DurationSource,
    /// Seek a cached reader back to its start before forward playback
    /// enters it again.
    pub rewind_on_reentry: bool,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            pts_synthesis: PtsSynthesis::FromDts,
            duration_source: DurationSource::Measured,
            rewind_on_reentry: true,
        }
    }
}

impl PlaylistConfig {
    /// Compatibility profile: `pts = dts + 1`, container durations, no
    /// rewinding.
    pub fn legacy() -> Self {
        Self {
            pts_synthesis: PtsSynthesis::LegacyDtsPlusOne,
            duration_source: DurationSource::Container,
            rewind_on_reentry: false,
            ..Default::default()
        }
    }

    /// Set the base directory for relative path resolution.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Set the `pts` synthesis policy.
    pub fn with_pts_synthesis(mut self, policy: PtsSynthesis) -> Self {
        self.pts_synthesis = policy;
        self
    }

    /// Set the duration policy.
    pub fn with_duration_source(mut self, source: DurationSource) -> Self {
        self.duration_source = source;
        self
    }

    /// Set whether re-entered readers are rewound.
    pub fn with_rewind_on_reentry(mut self, rewind: bool) -> Self {
        self.rewind_on_reentry = rewind;
        self
    }
}

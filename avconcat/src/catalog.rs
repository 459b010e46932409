//! The playlist catalog: an ordered list of item records.
//!
//! Each record owns everything known about one item (path, probed
//! duration and streams, and the opened reader if any), so insertion and
//! removal move a single value instead of several parallel tables.
//!
//! The catalog memoizes two prefix sums over the leading run of probed
//! items: cumulative duration and cumulative stream count. They are rebuilt
//! whenever the catalog mutates or an item's metadata changes, and they only
//! cover items up to the first one that has never been opened.

use crate::error::{PlaylistError, Result};
use crate::reader::{ItemReader, StreamInfo};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One playlist entry.
#[derive(Debug)]
pub struct PlaylistItem<R> {
    path: PathBuf,
    duration: Option<i64>,
    streams: Option<Vec<StreamInfo>>,
    pub(crate) reader: Option<R>,
    /// End of the last packet read from this item, local playlist time.
    pub(crate) measured_end_us: Option<i64>,
    /// The reader was read from or sought since it was last rewound.
    pub(crate) dirty: bool,
}

impl<R> PlaylistItem<R> {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            duration: None,
            streams: None,
            reader: None,
            measured_end_us: None,
            dirty: false,
        }
    }

    /// Path the item is opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration in microseconds; `None` until the item has been opened.
    pub fn duration(&self) -> Option<i64> {
        self.duration
    }

    /// Number of streams; `None` until the item has been opened.
    pub fn stream_count(&self) -> Option<usize> {
        self.streams.as_ref().map(Vec::len)
    }

    /// Stream information captured when the item was opened.
    pub fn streams(&self) -> Option<&[StreamInfo]> {
        self.streams.as_deref()
    }

    /// Whether the item has ever been opened and probed.
    pub fn is_probed(&self) -> bool {
        self.streams.is_some()
    }

    /// Whether a reader for the item is currently held.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

/// Ordered, mutable list of playlist items.
#[derive(Debug)]
pub struct PlaylistCatalog<R> {
    items: Vec<PlaylistItem<R>>,
    cum_durations: Vec<i64>,
    cum_streams: Vec<usize>,
}

impl<R> Default for PlaylistCatalog<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cum_durations: Vec::new(),
            cum_streams: Vec::new(),
        }
    }
}

impl<R: ItemReader> PlaylistCatalog<R> {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog from item paths, in order.
    pub fn from_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            items: paths
                .into_iter()
                .map(|p| PlaylistItem::new(p.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the catalog has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `pos`.
    pub fn item(&self, pos: usize) -> Option<&PlaylistItem<R>> {
        self.items.get(pos)
    }

    pub(crate) fn item_mut(&mut self, pos: usize) -> Option<&mut PlaylistItem<R>> {
        self.items.get_mut(pos)
    }

    /// Path of the item at `pos`.
    pub fn path(&self, pos: usize) -> Option<&Path> {
        self.items.get(pos).map(PlaylistItem::path)
    }

    /// All item paths, in order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().map(PlaylistItem::path)
    }

    /// Iterate over the items.
    pub fn items(&self) -> impl Iterator<Item = &PlaylistItem<R>> {
        self.items.iter()
    }

    /// Number of items holding an open reader.
    pub fn open_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_open()).count()
    }

    /// Add an item at the end.
    pub fn append(&mut self, path: impl Into<PathBuf>) {
        let pos = self.items.len();
        self.items.push(PlaylistItem::new(path.into()));
        debug!(index = pos, "Appended playlist item");
    }

    /// Insert an item at `pos`, shifting later items up. `pos == len()` appends.
    pub fn insert(&mut self, path: impl Into<PathBuf>, pos: usize) -> Result<()> {
        self.insert_playlist([path], pos)
    }

    /// Insert several items, in order, starting at `pos`.
    pub fn insert_playlist(
        &mut self,
        paths: impl IntoIterator<Item = impl Into<PathBuf>>,
        pos: usize,
    ) -> Result<()> {
        if pos > self.items.len() {
            return Err(PlaylistError::IndexOutOfRange {
                index: pos,
                len: self.items.len(),
            });
        }
        let before = self.items.len();
        self.items.splice(
            pos..pos,
            paths.into_iter().map(|p| PlaylistItem::new(p.into())),
        );
        debug!(index = pos, count = self.items.len() - before, "Inserted playlist items");
        self.rebuild_tables();
        Ok(())
    }

    /// Take the record at `pos` out of the catalog, shifting later items down.
    ///
    /// Readers are not closed here; [`ItemCache::remove`](crate::cache::ItemCache::remove)
    /// closes every reader whose index changes before calling this.
    pub(crate) fn remove(&mut self, pos: usize) -> Result<PlaylistItem<R>> {
        if pos >= self.items.len() {
            return Err(PlaylistError::IndexOutOfRange {
                index: pos,
                len: self.items.len(),
            });
        }
        let item = self.items.remove(pos);
        debug!(index = pos, path = %item.path.display(), "Removed playlist item");
        self.rebuild_tables();
        Ok(item)
    }

    /// Record the metadata of an item that has just been opened.
    ///
    /// An unknown duration is recorded as 0 so the cumulative tables can
    /// extend past the item. Metadata of an item already probed is kept.
    pub fn record_opened(
        &mut self,
        pos: usize,
        duration: Option<i64>,
        streams: Vec<StreamInfo>,
    ) -> Result<()> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(pos)
            .ok_or(PlaylistError::IndexOutOfRange { index: pos, len })?;
        if item.is_probed() {
            return Ok(());
        }
        let duration = duration.unwrap_or_else(|| {
            warn!(index = pos, path = %item.path.display(), "Item reports no duration, assuming 0");
            0
        });
        debug!(index = pos, duration_us = duration, streams = streams.len(), "Recorded opened item");
        item.duration = Some(duration.max(0));
        item.streams = Some(streams);
        self.rebuild_tables();
        Ok(())
    }

    /// Replace the duration of a probed item, e.g. with the one measured
    /// during playback.
    pub fn record_duration(&mut self, pos: usize, duration: i64) -> Result<()> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(pos)
            .ok_or(PlaylistError::IndexOutOfRange { index: pos, len })?;
        if item.duration != Some(duration) {
            debug!(index = pos, old_us = ?item.duration, new_us = duration, "Updated item duration");
            item.duration = Some(duration.max(0));
            self.rebuild_tables();
        }
        Ok(())
    }

    /// Number of leading items covered by the cumulative tables.
    pub fn probed_len(&self) -> usize {
        self.cum_durations.len()
    }

    /// Check if every item has been probed.
    pub fn is_fully_probed(&self) -> bool {
        self.probed_len() == self.items.len()
    }

    /// `cum[i]` = sum of the durations of items `0..=i`.
    pub fn cumulative_durations(&self) -> &[i64] {
        &self.cum_durations
    }

    /// `cum[i]` = sum of the stream counts of items `0..=i`.
    pub fn cumulative_stream_counts(&self) -> &[usize] {
        &self.cum_streams
    }

    /// Global time at which item `pos` starts, if it is covered by the tables.
    pub fn start_time(&self, pos: usize) -> Option<i64> {
        match pos {
            0 if self.probed_len() > 0 => Some(0),
            0 => None,
            _ if pos < self.probed_len() => Some(self.cum_durations[pos - 1]),
            _ => None,
        }
    }

    /// Total duration of the probed prefix.
    pub fn known_duration(&self) -> i64 {
        self.cum_durations.last().copied().unwrap_or(0)
    }

    /// Total stream count of the probed prefix.
    pub fn known_stream_count(&self) -> usize {
        self.cum_streams.last().copied().unwrap_or(0)
    }

    /// Index of the first item not covered by the tables, if any.
    pub fn first_unprobed(&self) -> Option<usize> {
        (!self.is_fully_probed()).then(|| self.probed_len())
    }

    fn rebuild_tables(&mut self) {
        self.cum_durations.clear();
        self.cum_streams.clear();
        let mut duration = 0i64;
        let mut streams = 0usize;
        for item in &self.items {
            let (Some(d), Some(s)) = (item.duration, item.stream_count()) else {
                break;
            };
            duration = duration.saturating_add(d);
            streams += s;
            self.cum_durations.push(duration);
            self.cum_streams.push(streams);
        }
    }
}

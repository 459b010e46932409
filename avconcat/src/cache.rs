//! Lazily opened item readers.
//!
//! The cache owns the [`ItemOpener`] and fills the reader slots of the
//! catalog's item records on first access. There is no eviction: every
//! reader stays open until [`ItemCache::close_all`] or until a removal
//! shifts its index, so open file handles grow with the number of
//! distinct items visited.

use crate::catalog::PlaylistCatalog;
use crate::error::{PlaylistError, Result};
use crate::reader::{ItemOpener, ItemReader};
use std::path::PathBuf;
use tracing::{debug, info};

/// Opens playlist items on demand and keeps them resident.
pub struct ItemCache<O: ItemOpener> {
    opener: O,
    opens: usize,
}

impl<O: ItemOpener> ItemCache<O> {
    /// Create a cache around an opener.
    pub fn new(opener: O) -> Self {
        Self { opener, opens: 0 }
    }

    /// Number of successful opens so far.
    pub fn open_count(&self) -> usize {
        self.opens
    }

    /// Reader for the item at `pos`, opening it if needed.
    ///
    /// A failed open leaves the slot empty, so a later call retries.
    pub fn get<'c>(
        &mut self,
        catalog: &'c mut PlaylistCatalog<O::Reader>,
        pos: usize,
    ) -> Result<&'c mut O::Reader> {
        self.ensure_open(catalog, pos)?;
        let len = catalog.len();
        catalog
            .item_mut(pos)
            .and_then(|item| item.reader.as_mut())
            .ok_or(PlaylistError::IndexOutOfRange { index: pos, len })
    }

    /// Open every item in `0..=pos` that has never been probed, so the
    /// catalog's cumulative tables cover `pos`.
    pub fn probe_through(
        &mut self,
        catalog: &mut PlaylistCatalog<O::Reader>,
        pos: usize,
    ) -> Result<()> {
        if pos >= catalog.len() {
            return Err(PlaylistError::IndexOutOfRange {
                index: pos,
                len: catalog.len(),
            });
        }
        while let Some(next) = catalog.first_unprobed() {
            if next > pos {
                break;
            }
            self.ensure_open(catalog, next)?;
        }
        Ok(())
    }

    /// Open the item at `pos` unless a reader is already held.
    pub fn ensure_open(
        &mut self,
        catalog: &mut PlaylistCatalog<O::Reader>,
        pos: usize,
    ) -> Result<()> {
        let len = catalog.len();
        let item = catalog
            .item(pos)
            .ok_or(PlaylistError::IndexOutOfRange { index: pos, len })?;
        if item.is_open() {
            return Ok(());
        }

        let path = item.path().to_path_buf();
        debug!(index = pos, path = %path.display(), "Opening playlist item");
        let reader = self
            .opener
            .open(&path)
            .map_err(|e| PlaylistError::item_open(pos, &path, e))?;

        let streams = (0..reader.num_streams())
            .filter_map(|i| reader.stream_info(i).cloned())
            .collect::<Vec<_>>();
        info!(
            index = pos,
            path = %path.display(),
            format = reader.format_name(),
            streams = streams.len(),
            duration_us = ?reader.duration(),
            "Opened playlist item"
        );
        catalog.record_opened(pos, reader.duration(), streams)?;

        if let Some(item) = catalog.item_mut(pos) {
            item.reader = Some(reader);
            item.dirty = false;
        }
        self.opens += 1;
        Ok(())
    }

    /// Close the reader of the item at `pos`, if open.
    pub fn close(&mut self, catalog: &mut PlaylistCatalog<O::Reader>, pos: usize) -> bool {
        let Some(item) = catalog.item_mut(pos) else {
            return false;
        };
        match item.reader.take() {
            Some(mut reader) => {
                debug!(index = pos, "Closing playlist item");
                reader.close();
                item.dirty = false;
                true
            }
            None => false,
        }
    }

    /// Close every open reader. Returns how many were closed.
    pub fn close_all(&mut self, catalog: &mut PlaylistCatalog<O::Reader>) -> usize {
        let closed = (0..catalog.len())
            .filter(|&pos| self.close(catalog, pos))
            .count();
        if closed > 0 {
            debug!(closed, "Closed all playlist items");
        }
        closed
    }

    /// Remove the item at `pos` from the catalog.
    ///
    /// The removed item's reader and the reader of every later item are
    /// closed first, since their indices change. Durations and streams of the
    /// shifted items are kept, so reopening them does not disturb the
    /// cumulative tables.
    pub fn remove(
        &mut self,
        catalog: &mut PlaylistCatalog<O::Reader>,
        pos: usize,
    ) -> Result<PathBuf> {
        if pos >= catalog.len() {
            return Err(PlaylistError::IndexOutOfRange {
                index: pos,
                len: catalog.len(),
            });
        }
        let invalidated = (pos..catalog.len())
            .filter(|&i| self.close(catalog, i))
            .count();
        let item = catalog.remove(pos)?;
        debug!(index = pos, invalidated, "Closed readers shifted by removal");
        Ok(item.path().to_path_buf())
    }
}

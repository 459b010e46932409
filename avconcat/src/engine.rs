//! The concatenating read engine.
//!
//! [`ConcatEngine`] drives packet reads and seeks against a cursor into
//! the playlist. Each packet is rebased onto the global timeline: its
//! stream index is offset by the stream counts of the preceding items and
//! its timestamps by their cumulative duration.
//!
//! When the current item ends cleanly the engine records the item's final
//! duration, moves the cursor to the next item, opens it and retries. Only
//! one such switch happens per call; an item that fails to open, or a
//! reader error, stops playback for good. Broken items are never skipped.
//!
//! # Example
//!
//! ```ignore
//! use avconcat::{ConcatEngine, PlaylistConfig, PlaylistSource};
//!
//! let source = PlaylistSource::from_paths(["intro.mp4", "main.mp4"]);
//! let mut engine = ConcatEngine::open(source, |path: &std::path::Path| {
//!     MyReader::open(path)
//! }, PlaylistConfig::default());
//!
//! while let Some(packet) = engine.read_next_packet()? {
//!     // packet timestamps are continuous across items
//! }
//! engine.close();
//! ```

use crate::cache::ItemCache;
use crate::catalog::PlaylistCatalog;
use crate::config::{DurationSource, PlaylistConfig, PtsSynthesis};
use crate::error::{PlaylistError, Result};
use crate::reader::{ItemOpener, ItemReader, ReaderKind, SeekMode, StreamInfo};
use crate::source::{resolve_item_path, PlaylistSource};
use crate::translator::TimelineTranslator;
use avconcat_core::{ContainerError, Error, Packet, PacketFlags, Timestamp};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Engine state.
#[derive(Debug, Clone)]
pub enum EngineState {
    /// No packet requested yet.
    Idle,
    /// Packets are being read from the item at this index.
    Streaming(usize),
    /// The last item ended; reads return `Ok(None)` until a seek.
    Exhausted,
    /// Playback stopped on this error; every later call returns it.
    Failed(PlaylistError),
    /// The engine was closed.
    Closed,
}

impl EngineState {
    /// Check if the engine is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Failed(_) | EngineState::Closed)
    }
}

/// A stream of the global stream table.
#[derive(Debug, Clone, Copy)]
pub struct GlobalStream<'a> {
    /// Index in the flattened playlist-wide stream table.
    pub global_index: usize,
    /// Playlist item that owns the stream.
    pub item_index: usize,
    /// Index of the stream within its item.
    pub local_index: usize,
    /// Stream information as reported by the item's reader.
    pub info: &'a StreamInfo,
}

/// Presents a playlist of items as one continuous packet stream.
pub struct ConcatEngine<O: ItemOpener> {
    catalog: PlaylistCatalog<O::Reader>,
    cache: ItemCache<O>,
    config: PlaylistConfig,
    current: usize,
    state: EngineState,
    /// Global start time of the current item.
    global_duration: i64,
    switches: usize,
    /// The next packet is the first one since the cursor entered an item.
    entered: bool,
    /// End of the last packet read from the current item, item-local.
    position_us: i64,
    /// Seek target for the current item once its reader is reopened.
    resume_us: Option<i64>,
}

impl<O: ItemOpener> ConcatEngine<O> {
    /// Create an engine over `source`. No item is opened until the first
    /// read or seek.
    pub fn open(source: PlaylistSource, opener: O, config: PlaylistConfig) -> Self {
        let paths = source.resolve(&config);
        Self::with_catalog(PlaylistCatalog::from_paths(paths), opener, config)
    }

    /// Create an engine over plain paths with the default configuration.
    pub fn from_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>, opener: O) -> Self {
        Self::open(PlaylistSource::from_paths(paths), opener, PlaylistConfig::default())
    }

    /// Create an engine over an existing catalog.
    pub fn with_catalog(catalog: PlaylistCatalog<O::Reader>, opener: O, config: PlaylistConfig) -> Self {
        debug!(items = catalog.len(), "Created playlist engine");
        Self {
            catalog,
            cache: ItemCache::new(opener),
            config,
            current: 0,
            state: EngineState::Idle,
            global_duration: 0,
            switches: 0,
            entered: true,
            position_us: 0,
            resume_us: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Index of the item supplying packets.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Path of the item supplying packets.
    pub fn current_path(&self) -> Option<&Path> {
        self.catalog.path(self.current)
    }

    /// Global start time of the current item, in microseconds.
    pub fn global_duration(&self) -> i64 {
        self.global_duration
    }

    /// Total duration of every item probed so far, `None` before any item
    /// has been opened. Exact once [`probe_all`](Self::probe_all) succeeded.
    pub fn total_duration(&self) -> Option<i64> {
        (self.catalog.probed_len() > 0).then(|| self.catalog.known_duration())
    }

    /// Number of global streams over the items probed so far.
    pub fn global_stream_count(&self) -> usize {
        self.catalog.known_stream_count()
    }

    /// Number of playlist items.
    pub fn item_count(&self) -> usize {
        self.catalog.len()
    }

    /// Number of items holding an open reader.
    pub fn opened_count(&self) -> usize {
        self.catalog.open_count()
    }

    /// Number of automatic item switches performed.
    pub fn switch_count(&self) -> usize {
        self.switches
    }

    /// The catalog.
    pub fn catalog(&self) -> &PlaylistCatalog<O::Reader> {
        &self.catalog
    }

    /// The configuration.
    pub fn config(&self) -> &PlaylistConfig {
        &self.config
    }

    /// Look up a global stream.
    pub fn stream(&self, global: usize) -> Option<GlobalStream<'_>> {
        let (item_index, local_index) =
            TimelineTranslator::for_catalog(&self.catalog).local_stream_index_for(global)?;
        let info = self.catalog.item(item_index)?.streams()?.get(local_index)?;
        Some(GlobalStream {
            global_index: global,
            item_index,
            local_index,
            info,
        })
    }

    /// Open every item not yet probed, making `total_duration` and
    /// `global_stream_count` exact.
    pub fn probe_all(&mut self) -> Result<()> {
        self.check_usable()?;
        if self.catalog.is_empty() {
            return Ok(());
        }
        let last = self.catalog.len() - 1;
        self.cache.probe_through(&mut self.catalog, last)
    }

    /// Read the next packet of the playlist. `Ok(None)` once the last item
    /// has ended.
    pub fn read_next_packet(&mut self) -> Result<Option<Packet<'static>>> {
        self.check_usable()?;
        if matches!(self.state, EngineState::Exhausted) {
            return Ok(None);
        }
        if self.catalog.is_empty() {
            return Err(self.fail(PlaylistError::PlaylistEmpty));
        }

        let mut switched = false;
        loop {
            let index = self.current;
            if let Err(e) = self.enter(index) {
                return Err(self.fail(e));
            }

            let result = match self.cache.get(&mut self.catalog, index) {
                Ok(reader) => reader.read_packet(),
                Err(e) => return Err(self.fail(e)),
            };

            match result {
                Ok(Some(packet)) => {
                    return match self.rebase(index, packet) {
                        Ok(packet) => Ok(Some(packet)),
                        Err(e) => Err(self.fail(e)),
                    };
                }
                Ok(None) => {}
                Err(e) if e.is_eof() => {}
                Err(e) => return Err(self.fail(PlaylistError::read(index, e))),
            }

            self.finish_item(index);

            if index + 1 >= self.catalog.len() {
                info!(index, total_us = self.catalog.known_duration(), "Playlist exhausted");
                self.state = EngineState::Exhausted;
                return Ok(None);
            }
            if switched {
                warn!(index, "Item ended immediately after switching to it");
                return Err(PlaylistError::EmptyItem { index });
            }
            if let Err(e) = self.advance_to(index + 1) {
                return Err(self.fail(e));
            }
            switched = true;
        }
    }

    /// Seek to `target`.
    ///
    /// With `Some(stream)`, `target` is in the time base of that global
    /// stream; with `None` it is in playlist time. Items between the
    /// probed prefix and the target are opened as needed. The previously
    /// current reader stays open.
    pub fn seek(&mut self, stream: Option<usize>, target: i64, mode: SeekMode) -> Result<()> {
        self.check_usable()?;
        if self.catalog.is_empty() {
            return Err(PlaylistError::PlaylistEmpty);
        }

        let requested = match stream {
            Some(global) => {
                self.probe_stream(global)?;
                let s = self
                    .stream(global)
                    .ok_or(PlaylistError::StreamNotFound { index: global })?;
                Some((s.item_index, s.local_index, s.info.time_base))
            }
            None => None,
        };
        let target_us = match requested {
            Some((_, _, time_base)) => time_base.to_playlist(target),
            None => target,
        }
        .max(0);

        let (index, local_us) = loop {
            let translator = TimelineTranslator::for_catalog(&self.catalog);
            if let Some(found) = translator.item_and_local_time_for(target_us) {
                break found;
            }
            match self.catalog.first_unprobed() {
                Some(next) => self.cache.ensure_open(&mut self.catalog, next)?,
                None => {
                    return Err(PlaylistError::SeekBeyondEnd {
                        target_us,
                        known_us: self.catalog.known_duration(),
                    })
                }
            }
        };

        let (local_stream, local_ts) = match requested {
            Some((item, local, time_base)) if item == index => {
                (Some(local), time_base.from_playlist(local_us))
            }
            _ => (None, local_us),
        };

        let reader = self.cache.get(&mut self.catalog, index)?;
        if !reader.can_seek() {
            return Err(PlaylistError::SeekUnsupported { index, source: None });
        }
        reader
            .seek(local_stream, local_ts, mode)
            .map_err(|e| PlaylistError::seek(index, e))?;
        if let Some(item) = self.catalog.item_mut(index) {
            item.dirty = true;
        }

        if index != self.current {
            debug!(from = self.current, to = index, "Seek moved playlist cursor");
        }
        self.current = index;
        self.state = EngineState::Streaming(index);
        self.entered = true;
        self.position_us = local_us;
        self.resume_us = None;
        self.refresh_global_duration();
        info!(
            target_us,
            index,
            local_us,
            offset_us = self.global_duration,
            "Seeked playlist"
        );
        Ok(())
    }

    /// Timestamp of the next packet of global stream `stream` at or after
    /// byte position `*pos` in the current item, rebased onto the playlist
    /// timeline.
    ///
    /// `Ok(None)` when the stream belongs to another item or the current
    /// reader cannot index by position.
    pub fn read_timestamp(
        &mut self,
        stream: usize,
        pos: &mut u64,
        pos_limit: u64,
    ) -> Result<Option<i64>> {
        self.check_usable()?;
        let s = self
            .stream(stream)
            .ok_or(PlaylistError::StreamNotFound { index: stream })?;
        if s.item_index != self.current {
            return Ok(None);
        }
        let (local, time_base) = (s.local_index, s.info.time_base);
        let index = self.current;
        let offset = self.catalog.start_time(index).unwrap_or(0);
        let reader = self.cache.get(&mut self.catalog, index)?;
        let found = reader
            .read_timestamp(local, pos, pos_limit)
            .map_err(|e| PlaylistError::read(index, e))?;
        Ok(found.map(|ts| Timestamp::new(ts, time_base).offset_by(offset).value))
    }

    /// Resume the current item.
    pub fn play(&mut self) -> Result<()> {
        self.check_usable()?;
        let index = self.current;
        let reader = self.cache.get(&mut self.catalog, index)?;
        reader.play().map_err(|e| PlaylistError::read(index, e))
    }

    /// Pause the current item.
    pub fn pause(&mut self) -> Result<()> {
        self.check_usable()?;
        let index = self.current;
        let reader = self.cache.get(&mut self.catalog, index)?;
        reader.pause().map_err(|e| PlaylistError::read(index, e))
    }

    /// Close every open reader. Calling it again does nothing.
    pub fn close(&mut self) {
        if matches!(self.state, EngineState::Closed) {
            return;
        }
        let closed = self.cache.close_all(&mut self.catalog);
        info!(closed, "Closed playlist");
        self.state = EngineState::Closed;
    }

    /// Append an item. Relative paths resolve against the configured base directory.
    pub fn append(&mut self, path: impl AsRef<Path>) {
        let path = resolve_item_path(path.as_ref(), self.config.base_dir.as_deref());
        self.catalog.append(path);
    }

    /// Insert an item at `pos`.
    pub fn insert(&mut self, path: impl AsRef<Path>, pos: usize) -> Result<()> {
        self.insert_playlist([path], pos)
    }

    /// Insert several items, in order, starting at `pos`.
    ///
    /// If the engine has started and `pos` is at or before the current
    /// item, the cursor moves with its item.
    pub fn insert_playlist(
        &mut self,
        paths: impl IntoIterator<Item = impl AsRef<Path>>,
        pos: usize,
    ) -> Result<()> {
        let base = self.config.base_dir.clone();
        let paths: Vec<PathBuf> = paths
            .into_iter()
            .map(|p| resolve_item_path(p.as_ref(), base.as_deref()))
            .collect();
        let count = paths.len();
        self.catalog.insert_playlist(paths, pos)?;
        if self.has_started() && pos <= self.current {
            self.current += count;
            if let EngineState::Streaming(_) = self.state {
                self.state = EngineState::Streaming(self.current);
            }
        }
        self.refresh_global_duration();
        Ok(())
    }

    /// Remove the item at `pos`.
    ///
    /// Readers of the removed item and of every item after it are closed.
    /// If that includes the item being streamed, it is reopened on the next
    /// read and sought back to where playback left off.
    pub fn remove(&mut self, pos: usize) -> Result<PathBuf> {
        if matches!(self.state, EngineState::Streaming(i) if i == pos) {
            return Err(PlaylistError::ActiveItem { index: pos });
        }
        let path = self.cache.remove(&mut self.catalog, pos)?;
        if matches!(self.state, EngineState::Streaming(i) if pos < i) {
            self.resume_us = Some(self.position_us);
        }
        if self.has_started() && pos < self.current {
            self.current -= 1;
            if let EngineState::Streaming(_) = self.state {
                self.state = EngineState::Streaming(self.current);
            }
        }
        if self.current >= self.catalog.len() {
            self.current = self.catalog.len().saturating_sub(1);
        }
        self.refresh_global_duration();
        Ok(path)
    }

    /// Open items until global stream `global` is covered by the tables.
    fn probe_stream(&mut self, global: usize) -> Result<()> {
        while global >= self.catalog.known_stream_count() {
            let Some(next) = self.catalog.first_unprobed() else {
                break;
            };
            self.cache.ensure_open(&mut self.catalog, next)?;
        }
        Ok(())
    }

    fn has_started(&self) -> bool {
        matches!(self.state, EngineState::Streaming(_) | EngineState::Exhausted)
    }

    fn check_usable(&self) -> Result<()> {
        match &self.state {
            EngineState::Failed(e) => Err(e.clone()),
            EngineState::Closed => Err(PlaylistError::Closed),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, error: PlaylistError) -> PlaylistError {
        warn!(index = ?error.index(), error = %error, "Playlist playback failed");
        self.state = EngineState::Failed(error.clone());
        error
    }

    /// Make `index` the streaming item: its predecessors probed, its reader open.
    fn enter(&mut self, index: usize) -> Result<()> {
        self.cache.probe_through(&mut self.catalog, index)?;
        self.cache.ensure_open(&mut self.catalog, index)?;
        if let Some(at_us) = self.resume_us.take() {
            self.resume(index, at_us)?;
        }
        self.state = EngineState::Streaming(index);
        self.refresh_global_duration();
        Ok(())
    }

    /// Seek a reopened reader back to the playback position it had.
    fn resume(&mut self, index: usize, at_us: i64) -> Result<()> {
        if at_us <= 0 {
            return Ok(());
        }
        let reader = self.cache.get(&mut self.catalog, index)?;
        if !reader.can_seek() {
            warn!(index, at_us, "Reopened item cannot seek, playing it from the start");
            return Ok(());
        }
        reader
            .seek(None, at_us, SeekMode::Backward)
            .map_err(|e| PlaylistError::seek(index, e))?;
        if let Some(item) = self.catalog.item_mut(index) {
            item.dirty = true;
        }
        debug!(index, at_us, "Resumed reopened item");
        Ok(())
    }

    /// Move the cursor to `next` after the current item ended.
    fn advance_to(&mut self, next: usize) -> Result<()> {
        let previous = self.current;
        self.current = next;
        self.enter(next)?;

        if self.config.rewind_on_reentry {
            let reader_dirty = self.catalog.item(next).map_or(false, |item| item.dirty);
            if reader_dirty {
                self.rewind(next)?;
            }
        }

        self.switches += 1;
        self.entered = true;
        self.position_us = 0;
        self.refresh_global_duration();
        info!(
            from = previous,
            to = next,
            offset_us = self.global_duration,
            "Switched playlist item"
        );
        Ok(())
    }

    /// Bring a re-entered reader back to its start. Readers that cannot
    /// seek, or fail to, are closed and opened again.
    fn rewind(&mut self, index: usize) -> Result<()> {
        debug!(index, "Rewinding re-entered item");
        let reader = self.cache.get(&mut self.catalog, index)?;
        let rewound = reader.can_seek()
            && match reader.seek(None, 0, SeekMode::Backward) {
                Ok(()) => true,
                Err(e) => {
                    warn!(index, error = %e, "Rewind failed");
                    false
                }
            };
        if rewound {
            if let Some(item) = self.catalog.item_mut(index) {
                item.dirty = false;
            }
        } else {
            debug!(index, "Reopening item to rewind it");
            self.cache.close(&mut self.catalog, index);
            self.cache.ensure_open(&mut self.catalog, index)?;
        }
        Ok(())
    }

    /// Record the final duration of an item that reached its end.
    fn finish_item(&mut self, index: usize) {
        if self.config.duration_source != DurationSource::Measured {
            return;
        }
        let measured = self.catalog.item(index).and_then(|item| item.measured_end_us);
        if let Some(end) = measured {
            // Index is known valid: the item was just read from.
            let _ = self.catalog.record_duration(index, end);
        }
    }

    fn refresh_global_duration(&mut self) {
        self.global_duration = self.catalog.start_time(self.current).unwrap_or(0);
    }

    /// Map a packet read from item `index` onto the global timeline.
    fn rebase(&mut self, index: usize, mut packet: Packet<'static>) -> Result<Packet<'static>> {
        let local = packet.stream_index;
        let global = TimelineTranslator::for_catalog(&self.catalog)
            .global_stream_index_for(index, local)
            .ok_or_else(|| {
                PlaylistError::read(
                    index,
                    Error::Container(ContainerError::StreamNotFound { index: local }),
                )
            })?;
        let offset = self.catalog.start_time(index).unwrap_or(0);

        let len = self.catalog.len();
        let Some(item) = self.catalog.item_mut(index) else {
            return Err(PlaylistError::IndexOutOfRange { index, len });
        };
        if let Some(end) = packet.end_time_us() {
            item.measured_end_us = Some(item.measured_end_us.map_or(end, |m| m.max(end)));
            self.position_us = end;
        }
        item.dirty = true;
        let has_b_frames = item
            .streams()
            .and_then(|s| s.get(local))
            .map_or(false, |s| s.has_b_frames);

        if !has_b_frames {
            match self.config.pts_synthesis {
                PtsSynthesis::FromDts => {
                    if !packet.pts.is_valid() {
                        packet.pts = packet.dts;
                    }
                }
                PtsSynthesis::LegacyDtsPlusOne => {
                    if let Some(dts) = packet.dts.get() {
                        packet.pts = Timestamp::new(dts.saturating_add(1), packet.dts.time_base);
                    }
                }
                PtsSynthesis::Disabled => {}
            }
        }

        packet.dts = packet.dts.offset_by(offset);
        packet.pts = packet.pts.offset_by(offset);
        packet.stream_index = global;
        if self.entered {
            packet.flags.insert(PacketFlags::ITEM_START);
            self.entered = false;
        }
        Ok(packet)
    }
}

impl<O: ItemOpener> Drop for ConcatEngine<O> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<O: ItemOpener> ItemReader for ConcatEngine<O> {
    fn format_name(&self) -> &str {
        "concat"
    }

    fn kind(&self) -> ReaderKind {
        ReaderKind::Concat {
            items: self.catalog.len(),
        }
    }

    fn duration(&self) -> Option<i64> {
        self.total_duration()
    }

    fn num_streams(&self) -> usize {
        self.global_stream_count()
    }

    fn stream_info(&self, index: usize) -> Option<&StreamInfo> {
        self.stream(index).map(|s| s.info)
    }

    fn read_packet(&mut self) -> avconcat_core::Result<Option<Packet<'static>>> {
        self.read_next_packet().map_err(Into::into)
    }

    fn seek(&mut self, stream: Option<usize>, timestamp: i64, mode: SeekMode) -> avconcat_core::Result<()> {
        ConcatEngine::seek(self, stream, timestamp, mode).map_err(Into::into)
    }

    fn read_timestamp(
        &mut self,
        stream: usize,
        pos: &mut u64,
        pos_limit: u64,
    ) -> avconcat_core::Result<Option<i64>> {
        ConcatEngine::read_timestamp(self, stream, pos, pos_limit).map_err(Into::into)
    }

    fn play(&mut self) -> avconcat_core::Result<()> {
        ConcatEngine::play(self).map_err(Into::into)
    }

    fn pause(&mut self) -> avconcat_core::Result<()> {
        ConcatEngine::pause(self).map_err(Into::into)
    }

    fn close(&mut self) {
        ConcatEngine::close(self)
    }
}

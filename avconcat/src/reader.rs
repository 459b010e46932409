//! The item reader contract.
//!
//! A playlist item is read through an [`ItemReader`]: an already-opened
//! demuxer for one media file. Readers are produced by an [`ItemOpener`],
//! which the playlist calls lazily the first time an item is needed.

use avconcat_core::{Packet, Result, TimeBase};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seek mode options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeekMode {
    /// Seek to the nearest keyframe at or before the target (default).
    #[default]
    Backward,
    /// Seek to the nearest keyframe at or after the target.
    Forward,
    /// Seek to the exact position (may land on non-keyframe).
    Exact,
}

/// Track type of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackType {
    /// Video track.
    Video,
    /// Audio track.
    Audio,
    /// Subtitle track.
    Subtitle,
    /// Data track.
    Data,
    /// Unknown track type.
    Unknown,
}

/// Codec identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecId {
    H264,
    H265,
    Vp9,
    Av1,
    Mpeg4,
    Aac,
    Mp3,
    Opus,
    Vorbis,
    Flac,
    Pcm,
    /// Unknown codec, by name.
    Unknown(String),
}

/// Information about one elementary stream of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Stream index, local to the item that owns it.
    pub index: usize,
    /// Track type.
    pub track_type: TrackType,
    /// Codec ID.
    pub codec_id: CodecId,
    /// Time base of the stream's packet timestamps.
    pub time_base: TimeBase,
    /// Whether the codec reorders frames (B-frames), making `pts` independent of `dts`.
    pub has_b_frames: bool,
}

impl StreamInfo {
    /// Create stream info without frame reordering.
    pub fn new(index: usize, track_type: TrackType, codec_id: CodecId, time_base: TimeBase) -> Self {
        Self {
            index,
            track_type,
            codec_id,
            time_base,
            has_b_frames: false,
        }
    }

    /// Mark the stream as using B-frames.
    pub fn with_b_frames(mut self, has_b_frames: bool) -> Self {
        self.has_b_frames = has_b_frames;
        self
    }
}

/// What kind of reader this is.
///
/// Hosts use this to tell a concatenating reader apart from a plain one
/// without inspecting format names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    /// Reads a single media item.
    Plain,
    /// Concatenates a playlist of `items` items.
    Concat { items: usize },
}

/// An opened media item.
///
/// Durations are in playlist time (microseconds). Packet timestamps are in
/// the time base of the stream they belong to, and packet stream indices
/// are local to the reader.
pub trait ItemReader {
    /// Short format name, for logs.
    fn format_name(&self) -> &str;

    /// Reader kind.
    fn kind(&self) -> ReaderKind {
        ReaderKind::Plain
    }

    /// Duration in microseconds, if the container reports one.
    fn duration(&self) -> Option<i64>;

    /// Number of streams.
    fn num_streams(&self) -> usize;

    /// Stream information.
    fn stream_info(&self, index: usize) -> Option<&StreamInfo>;

    /// Read the next packet. `Ok(None)` signals the end of the item.
    fn read_packet(&mut self) -> Result<Option<Packet<'static>>>;

    /// Seek to `timestamp`.
    ///
    /// With `Some(stream)`, `timestamp` is in that stream's time base; with
    /// `None` it is in playlist time.
    fn seek(&mut self, stream: Option<usize>, timestamp: i64, mode: SeekMode) -> Result<()>;

    /// Check if seeking is supported by this reader.
    fn can_seek(&self) -> bool {
        true
    }

    /// Read the timestamp of the next packet of `stream` found at or after
    /// byte position `*pos`, not past `pos_limit`, updating `*pos` to where
    /// it was found. `Ok(None)` if the reader cannot index by position.
    fn read_timestamp(
        &mut self,
        _stream: usize,
        _pos: &mut u64,
        _pos_limit: u64,
    ) -> Result<Option<i64>> {
        Ok(None)
    }

    /// Resume a paused network-backed item. No-op by default.
    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    /// Pause a network-backed item. No-op by default.
    fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release file handles and decoder state.
    fn close(&mut self);
}

/// Opens playlist items.
pub trait ItemOpener {
    /// The reader type produced.
    type Reader: ItemReader;

    /// Open and probe the item at `path`.
    fn open(&mut self, path: &Path) -> Result<Self::Reader>;
}

impl<F, R> ItemOpener for F
where
    F: FnMut(&Path) -> Result<R>,
    R: ItemReader,
{
    type Reader = R;

    fn open(&mut self, path: &Path) -> Result<R> {
        self(path)
    }
}

impl<R: ItemReader + ?Sized> ItemReader for Box<R> {
    fn format_name(&self) -> &str {
        (**self).format_name()
    }

    fn kind(&self) -> ReaderKind {
        (**self).kind()
    }

    fn duration(&self) -> Option<i64> {
        (**self).duration()
    }

    fn num_streams(&self) -> usize {
        (**self).num_streams()
    }

    fn stream_info(&self, index: usize) -> Option<&StreamInfo> {
        (**self).stream_info(index)
    }

    fn read_packet(&mut self) -> Result<Option<Packet<'static>>> {
        (**self).read_packet()
    }

    fn seek(&mut self, stream: Option<usize>, timestamp: i64, mode: SeekMode) -> Result<()> {
        (**self).seek(stream, timestamp, mode)
    }

    fn can_seek(&self) -> bool {
        (**self).can_seek()
    }

    fn read_timestamp(&mut self, stream: usize, pos: &mut u64, pos_limit: u64) -> Result<Option<i64>> {
        (**self).read_timestamp(stream, pos, pos_limit)
    }

    fn play(&mut self) -> Result<()> {
        (**self).play()
    }

    fn pause(&mut self) -> Result<()> {
        (**self).pause()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

//! Encoded media packets as handed out by item readers.

use crate::timestamp::{Duration, TimeBase, Timestamp};
use bitflags::bitflags;
use std::borrow::Cow;
use std::fmt;

bitflags! {
    /// Flags for packet properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// This packet contains a keyframe.
        const KEYFRAME = 0x0001;
        /// Packet data is corrupted.
        const CORRUPT = 0x0002;
        /// Packet should be discarded.
        const DISCARD = 0x0004;
        /// First packet delivered from a newly entered playlist item.
        const ITEM_START = 0x0010;
    }
}

/// An encoded media packet.
///
/// `stream_index` is local to whichever reader produced the packet; the
/// playlist engine rewrites it to the global index before handing it on.
#[derive(Clone)]
pub struct Packet<'a> {
    data: Cow<'a, [u8]>,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Decode timestamp.
    pub dts: Timestamp,
    /// Duration of the packet.
    pub duration: Duration,
    /// Stream index this packet belongs to.
    pub stream_index: usize,
    /// Packet flags.
    pub flags: PacketFlags,
    /// Byte position in the source item, if known.
    pub pos: Option<u64>,
}

impl<'a> Packet<'a> {
    /// Create a new packet with owned data and undefined timestamps.
    pub fn new(data: Vec<u8>, time_base: TimeBase) -> Self {
        Self::with_data(Cow::Owned(data), time_base)
    }

    /// Create a new packet referencing external data.
    pub fn from_slice(data: &'a [u8], time_base: TimeBase) -> Self {
        Self::with_data(Cow::Borrowed(data), time_base)
    }

    fn with_data(data: Cow<'a, [u8]>, time_base: TimeBase) -> Self {
        Self {
            data,
            pts: Timestamp::none(time_base),
            dts: Timestamp::none(time_base),
            duration: Duration::new(0, time_base),
            stream_index: 0,
            flags: PacketFlags::empty(),
            pos: None,
        }
    }

    /// Get the packet payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the size of the payload.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this packet is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this is a keyframe packet.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(PacketFlags::KEYFRAME)
    }

    /// The time base of the packet's timestamps (taken from `dts`).
    pub fn time_base(&self) -> TimeBase {
        self.dts.time_base
    }

    /// Make the packet own its data.
    pub fn into_owned(self) -> Packet<'static> {
        Packet {
            data: Cow::Owned(self.data.into_owned()),
            pts: self.pts,
            dts: self.dts,
            duration: self.duration,
            stream_index: self.stream_index,
            flags: self.flags,
            pos: self.pos,
        }
    }

    /// The instant, in playlist time, at which this packet ends: the later
    /// of `pts`/`dts` plus the packet duration. `None` if neither timestamp
    /// is defined.
    pub fn end_time_us(&self) -> Option<i64> {
        let start = match (self.pts.to_playlist(), self.dts.to_playlist()) {
            (Some(p), Some(d)) => p.max(d),
            (Some(p), None) => p,
            (None, Some(d)) => d,
            (None, None) => return None,
        };
        Some(start.saturating_add(self.duration.to_playlist()))
    }

    /// Set both timestamps in the given time base.
    pub fn with_timestamps(mut self, pts: Option<i64>, dts: Option<i64>, time_base: TimeBase) -> Self {
        self.pts = pts.map_or(Timestamp::none(time_base), |v| Timestamp::new(v, time_base));
        self.dts = dts.map_or(Timestamp::none(time_base), |v| Timestamp::new(v, time_base));
        self.duration.time_base = time_base;
        self
    }

    /// Set the packet duration in its current time base.
    pub fn with_duration(mut self, value: i64) -> Self {
        self.duration = Duration::new(value, self.dts.time_base);
        self
    }

    /// Set the stream index.
    pub fn with_stream_index(mut self, index: usize) -> Self {
        self.stream_index = index;
        self
    }

    /// Set the packet flags.
    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl<'a> fmt::Debug for Packet<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("size", &self.size())
            .field("pts", &self.pts)
            .field("dts", &self.dts)
            .field("stream_index", &self.stream_index)
            .field("flags", &self.flags)
            .finish()
    }
}

//! Scripted in-memory item readers for driving the engine in tests.

#![allow(dead_code)]

use avconcat::{CodecId, ItemReader, SeekMode, StreamInfo, TrackType};
use avconcat_core::{ContainerError, Error, Packet, PacketFlags, Result, TimeBase};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Something that happened to a scripted reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    OpenAttempt(PathBuf),
    Seek {
        path: PathBuf,
        stream: Option<usize>,
        timestamp: i64,
    },
    Play(PathBuf),
    Pause(PathBuf),
    Close(PathBuf),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Contents of one scripted item.
#[derive(Debug, Clone)]
pub struct ScriptedItem {
    pub duration_us: Option<i64>,
    pub streams: Vec<StreamInfo>,
    pub packets: Vec<Packet<'static>>,
    pub can_seek: bool,
    /// Fail the read of the packet at this position.
    pub fail_read_at: Option<usize>,
}

impl ScriptedItem {
    /// One audio stream in `time_base`, packets every `step` ticks covering
    /// `duration` ticks, with `pts == dts`.
    pub fn uniform(duration: i64, step: i64, time_base: TimeBase) -> Self {
        let packets = (0..duration / step)
            .map(|k| {
                Packet::new(vec![k as u8], time_base)
                    .with_timestamps(Some(k * step), Some(k * step), time_base)
                    .with_duration(step)
                    .with_flags(PacketFlags::KEYFRAME)
            })
            .collect();
        Self {
            duration_us: Some(time_base.to_playlist(duration)),
            streams: vec![StreamInfo::new(0, TrackType::Audio, CodecId::Aac, time_base)],
            packets,
            can_seek: true,
            fail_read_at: None,
        }
    }

    /// Uniform item in microseconds.
    pub fn micros(duration_us: i64, step_us: i64) -> Self {
        Self::uniform(duration_us, step_us, TimeBase::MICROSECONDS)
    }

    /// An item that opens fine but yields no packet.
    pub fn empty(duration_us: i64) -> Self {
        Self {
            packets: Vec::new(),
            ..Self::micros(duration_us, duration_us.max(1))
        }
    }

    pub fn with_duration(mut self, duration_us: Option<i64>) -> Self {
        self.duration_us = duration_us;
        self
    }

    pub fn without_pts(mut self) -> Self {
        for p in &mut self.packets {
            p.pts = avconcat_core::Timestamp::none(p.pts.time_base);
        }
        self
    }

    pub fn with_b_frames(mut self) -> Self {
        for s in &mut self.streams {
            s.has_b_frames = true;
        }
        self
    }

    pub fn unseekable(mut self) -> Self {
        self.can_seek = false;
        self
    }

    pub fn failing_at(mut self, pos: usize) -> Self {
        self.fail_read_at = Some(pos);
        self
    }

    /// Add a second stream (video, 1/90000) and interleave one packet of it
    /// after every audio packet, at the same instant.
    pub fn with_video(mut self) -> Self {
        let tb = TimeBase::MPEG;
        self.streams
            .push(StreamInfo::new(1, TrackType::Video, CodecId::H264, tb));
        let mut packets = Vec::with_capacity(self.packets.len() * 2);
        for audio in self.packets.drain(..) {
            let at = audio.dts.to_playlist().unwrap_or(0);
            let ticks = tb.from_playlist(at);
            let video = Packet::new(vec![0xFF], tb)
                .with_timestamps(Some(ticks), Some(ticks), tb)
                .with_stream_index(1);
            packets.push(audio);
            packets.push(video);
        }
        self.packets = packets;
        self
    }
}

/// Reader over a [`ScriptedItem`].
pub struct ScriptedReader {
    path: PathBuf,
    item: ScriptedItem,
    pos: usize,
    log: EventLog,
}

impl ItemReader for ScriptedReader {
    fn format_name(&self) -> &str {
        "scripted"
    }

    fn duration(&self) -> Option<i64> {
        self.item.duration_us
    }

    fn num_streams(&self) -> usize {
        self.item.streams.len()
    }

    fn stream_info(&self, index: usize) -> Option<&StreamInfo> {
        self.item.streams.get(index)
    }

    fn read_packet(&mut self) -> Result<Option<Packet<'static>>> {
        if self.item.fail_read_at == Some(self.pos) {
            return Err(Error::Container(ContainerError::InvalidStructure(
                "truncated packet".into(),
            )));
        }
        let packet = self.item.packets.get(self.pos).cloned();
        if packet.is_some() {
            self.pos += 1;
        }
        Ok(packet)
    }

    fn seek(&mut self, stream: Option<usize>, timestamp: i64, _mode: SeekMode) -> Result<()> {
        if !self.item.can_seek {
            return Err(Error::unsupported("scripted item cannot seek"));
        }
        self.log.borrow_mut().push(Event::Seek {
            path: self.path.clone(),
            stream,
            timestamp,
        });
        let target_us = match stream {
            Some(s) => self
                .item
                .streams
                .get(s)
                .ok_or(Error::Container(ContainerError::StreamNotFound { index: s }))?
                .time_base
                .to_playlist(timestamp),
            None => timestamp,
        };
        self.pos = self
            .item
            .packets
            .iter()
            .position(|p| p.dts.to_playlist().map_or(false, |d| d >= target_us))
            .unwrap_or(self.item.packets.len());
        Ok(())
    }

    fn can_seek(&self) -> bool {
        self.item.can_seek
    }

    /// Positions are packet indices.
    fn read_timestamp(&mut self, stream: usize, pos: &mut u64, pos_limit: u64) -> Result<Option<i64>> {
        let start = *pos as usize;
        let end = (pos_limit as usize).min(self.item.packets.len());
        let found = (start..end).find(|&i| self.item.packets[i].stream_index == stream);
        Ok(found.and_then(|i| {
            *pos = i as u64;
            self.item.packets[i].dts.get()
        }))
    }

    fn play(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Event::Play(self.path.clone()));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Event::Pause(self.path.clone()));
        Ok(())
    }

    fn close(&mut self) {
        self.log.borrow_mut().push(Event::Close(self.path.clone()));
    }
}

/// A set of scripted items addressable by path.
#[derive(Clone, Default)]
pub struct Library {
    items: Rc<RefCell<HashMap<PathBuf, ScriptedItem>>>,
    pub log: EventLog,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, item: ScriptedItem) -> Self {
        self.items.borrow_mut().insert(PathBuf::from(path), item);
        self
    }

    /// Opener closure; unknown paths fail like a missing file.
    pub fn opener(&self) -> impl FnMut(&Path) -> Result<ScriptedReader> {
        let items = self.items.clone();
        let log = self.log.clone();
        move |path: &Path| {
            log.borrow_mut().push(Event::OpenAttempt(path.to_path_buf()));
            let item = items.borrow().get(path).cloned().ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                ))
            })?;
            Ok(ScriptedReader {
                path: path.to_path_buf(),
                item,
                pos: 0,
                log: log.clone(),
            })
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn open_attempts(&self, path: &str) -> usize {
        self.count(|e| matches!(e, Event::OpenAttempt(p) if p == Path::new(path)))
    }

    pub fn closes(&self, path: &str) -> usize {
        self.count(|e| matches!(e, Event::Close(p) if p == Path::new(path)))
    }

    pub fn seeks(&self, path: &str) -> Vec<(Option<usize>, i64)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Seek {
                    path: p,
                    stream,
                    timestamp,
                } if p == Path::new(path) => Some((*stream, *timestamp)),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.log.borrow().iter().filter(|e| pred(e)).count()
    }
}

/// The three-item playlist used throughout: durations 1000, 2000, 1500us,
/// one packet every 100us.
pub fn three_items() -> Library {
    Library::new()
        .with("a", ScriptedItem::micros(1000, 100))
        .with("b", ScriptedItem::micros(2000, 100))
        .with("c", ScriptedItem::micros(1500, 100))
}

/// Read every remaining packet.
pub fn drain<O: avconcat::ItemOpener>(
    engine: &mut avconcat::ConcatEngine<O>,
) -> avconcat::Result<Vec<Packet<'static>>> {
    let mut out = Vec::new();
    while let Some(p) = engine.read_next_packet()? {
        out.push(p);
    }
    Ok(out)
}

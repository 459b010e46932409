//! Seamless playlist demuxing.
//!
//! This crate presents a playlist of independently encoded media items as a
//! single demuxer: one timeline of packets with continuous timestamps and
//! one flattened set of stream indices, while items are opened lazily and
//! switched transparently as each one ends.
//!
//! Building blocks, leaf first:
//! - [`ItemReader`] / [`ItemOpener`]: the contract for reading one item
//! - [`PlaylistCatalog`]: ordered item records with cumulative tables
//! - [`ItemCache`]: opens items on first use and keeps them resident
//! - [`TimelineTranslator`]: global ↔ item-local time and stream lookups
//! - [`ConcatEngine`]: the read/seek state machine

pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod reader;
pub mod source;
pub mod translator;

pub use cache::ItemCache;
pub use catalog::{PlaylistCatalog, PlaylistItem};
pub use config::{DurationSource, PlaylistConfig, PtsSynthesis};
pub use engine::{ConcatEngine, EngineState, GlobalStream};
pub use error::{PlaylistError, Result};
pub use reader::{CodecId, ItemOpener, ItemReader, ReaderKind, SeekMode, StreamInfo, TrackType};
pub use source::{resolve_item_path, PlaylistSource};
pub use translator::TimelineTranslator;

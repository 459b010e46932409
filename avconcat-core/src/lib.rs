//! # avconcat core
//!
//! Media primitives shared by the avconcat playlist demuxer and the item
//! readers it drives:
//! - Error types reported by item readers
//! - Rational time bases and timestamp rescaling
//! - Encoded packets with decode/presentation timestamps

pub mod error;
pub mod packet;
pub mod rational;
pub mod timestamp;

pub use error::{ContainerError, Error, Result};
pub use packet::{Packet, PacketFlags};
pub use rational::Rational;
pub use timestamp::{Duration, TimeBase, Timestamp, PLAYLIST_TIME_BASE};

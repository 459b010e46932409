//! Timestamps, durations and time bases.
//!
//! All cross-item arithmetic in a playlist happens in
//! [`PLAYLIST_TIME_BASE`]; per-stream time bases only appear at the
//! boundary with an item reader.

use crate::rational::Rational;
use std::fmt;

/// A time base for converting between timestamp units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBase(pub Rational);

/// The fixed time base of the global playlist timeline.
pub const PLAYLIST_TIME_BASE: TimeBase = TimeBase::MICROSECONDS;

impl TimeBase {
    /// Create a new time base from numerator and denominator.
    pub fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// Standard MPEG time base (1/90000).
    pub const MPEG: Self = Self(Rational { num: 1, den: 90000 });

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self(Rational { num: 1, den: 1000 });

    /// Microsecond time base (1/1000000).
    pub const MICROSECONDS: Self = Self(Rational { num: 1, den: 1000000 });

    /// Convert a value from this time base to another.
    pub fn convert(&self, value: i64, target: TimeBase) -> i64 {
        if *self == target {
            return value;
        }
        self.0.rescale(value, target.0)
    }

    /// Convert a value in this time base to playlist time.
    pub fn to_playlist(&self, value: i64) -> i64 {
        self.convert(value, PLAYLIST_TIME_BASE)
    }

    /// Convert a playlist-time value into this time base.
    pub fn from_playlist(&self, value: i64) -> i64 {
        PLAYLIST_TIME_BASE.convert(value, *self)
    }

    /// Convert to seconds as f64.
    pub fn to_seconds(&self, value: i64) -> f64 {
        value as f64 * self.0.to_f64()
    }

    /// Get the time base as a rational.
    pub fn as_rational(&self) -> Rational {
        self.0
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        PLAYLIST_TIME_BASE
    }
}

impl From<Rational> for TimeBase {
    fn from(r: Rational) -> Self {
        Self(r)
    }
}

impl From<(i32, i32)> for TimeBase {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num as i64, den as i64)
    }
}

/// A timestamp with an associated time base.
///
/// The value [`Timestamp::NONE`] marks an absent timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// The raw timestamp value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Timestamp {
    /// Value representing an undefined timestamp.
    pub const NONE: i64 = i64::MIN;

    /// Create a new timestamp.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create an undefined timestamp in the given time base.
    pub fn none(time_base: TimeBase) -> Self {
        Self {
            value: Self::NONE,
            time_base,
        }
    }

    /// Check if this timestamp is defined.
    pub fn is_valid(&self) -> bool {
        self.value != Self::NONE
    }

    /// The value, if defined.
    pub fn get(&self) -> Option<i64> {
        self.is_valid().then_some(self.value)
    }

    /// Convert to a different time base. Undefined stays undefined.
    pub fn rescale(&self, target: TimeBase) -> Self {
        if !self.is_valid() {
            return Self::none(target);
        }
        Self {
            value: self.time_base.convert(self.value, target),
            time_base: target,
        }
    }

    /// The value in playlist time, if defined.
    pub fn to_playlist(&self) -> Option<i64> {
        self.get().map(|v| self.time_base.to_playlist(v))
    }

    /// Shift by a playlist-time offset, converted into this timestamp's
    /// time base. Undefined stays undefined.
    pub fn offset_by(&self, offset_us: i64) -> Self {
        if !self.is_valid() || offset_us == 0 {
            return *self;
        }
        let delta = self.time_base.from_playlist(offset_us);
        Self {
            value: self.value.saturating_add(delta),
            time_base: self.time_base,
        }
    }

    /// Convert to seconds.
    pub fn to_seconds(&self) -> Option<f64> {
        self.get().map(|v| self.time_base.to_seconds(v))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(secs) = self.to_seconds() {
            let hours = (secs / 3600.0) as u32;
            let mins = ((secs % 3600.0) / 60.0) as u32;
            let secs = secs % 60.0;
            write!(f, "{:02}:{:02}:{:06.3}", hours, mins, secs)
        } else {
            write!(f, "NONE")
        }
    }
}

/// A duration with an associated time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// The raw duration value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Duration {
    /// Create a new duration.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create a zero duration.
    pub fn zero() -> Self {
        Self {
            value: 0,
            time_base: PLAYLIST_TIME_BASE,
        }
    }

    /// Check if this duration is zero.
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// The duration in playlist time.
    pub fn to_playlist(&self) -> i64 {
        self.time_base.to_playlist(self.value)
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_base_convert() {
        assert_eq!(TimeBase::MILLISECONDS.convert(1000, TimeBase::MPEG), 90000);
    }

    #[test]
    fn test_playlist_round_trip_exact() {
        let tb = TimeBase::MPEG;
        assert_eq!(tb.to_playlist(90_000), 1_000_000);
        assert_eq!(tb.from_playlist(1_000_000), 90_000);
    }

    #[test]
    fn test_offset_by_converts_into_stream_base() {
        let ts = Timestamp::new(10, TimeBase::MILLISECONDS);
        let shifted = ts.offset_by(1_000_000);
        assert_eq!(shifted.value, 1010);
        assert_eq!(shifted.time_base, TimeBase::MILLISECONDS);
    }

    #[test]
    fn test_offset_by_keeps_none() {
        let ts = Timestamp::none(TimeBase::MPEG);
        assert!(!ts.offset_by(5_000).is_valid());
    }

    #[test]
    fn test_rescale_none() {
        let ts = Timestamp::none(TimeBase::MPEG).rescale(TimeBase::MILLISECONDS);
        assert!(!ts.is_valid());
        assert_eq!(ts.time_base, TimeBase::MILLISECONDS);
    }

    #[test]
    fn test_duration_to_playlist() {
        let d = Duration::new(45_000, TimeBase::MPEG);
        assert_eq!(d.to_playlist(), 500_000);
    }

    #[test]
    fn test_timestamp_display() {
        let ts = Timestamp::new(3723500, TimeBase::MILLISECONDS);
        assert_eq!(format!("{}", ts), "01:02:03.500");
        assert_eq!(format!("{}", Timestamp::none(TimeBase::MPEG)), "NONE");
    }
}

//! # Timestamp normalization
//!
//! Turns the two encoder timelines (presentation and decode order) into what
//! an FLV data tag needs:
//!
//! - a composition-time offset, `pts - dts` in whole milliseconds, and
//! - a stream-relative tag timestamp measured from the session's first
//!   decode time, so the first emitted sample reads 0.
//!
//! Both values are derived from the decode time rather than from the
//! previous sample or the presentation time. A composition offset measured
//! against the previous sample's decode time would shift with frame spacing,
//! and a timestamp taken from presentation order would run backwards across
//! B-frames.
//!
//! Samples whose decode time goes backwards relative to the last accepted
//! sample are rejected. The caller drops them; tags stay monotonic.
//!
//! [`TimestampNormalizer::compute`] is side-effect free and
//! [`TimestampNormalizer::commit`] records a sample as emitted, so a sample
//! that fails later in framing leaves the timeline untouched.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::video::{MAX_COMPOSITION_TIME, MIN_COMPOSITION_TIME};

/// A rational media time: `value / timescale` seconds.
///
/// A timescale of zero is treated as one.
#[derive(Debug, Clone, Copy)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: u32,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime::new(0, 1);

    pub const fn new(value: i64, timescale: u32) -> Self {
        Self { value, timescale }
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self::new(millis, 1000)
    }

    /// Rounds `seconds` onto the given timescale.
    pub fn from_secs_f64(seconds: f64, timescale: u32) -> Self {
        let scale = timescale.max(1);
        Self::new((seconds * scale as f64).round() as i64, scale)
    }

    fn scale(&self) -> i128 {
        self.timescale.max(1) as i128
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.value as f64 / self.scale() as f64
    }

    /// `self - earlier` in milliseconds. The subtraction is exact; only the
    /// final division is done in floating point.
    pub fn millis_since(&self, earlier: MediaTime) -> f64 {
        let numerator = (self.value as i128 * earlier.scale() - earlier.value as i128 * self.scale())
            * 1000;
        let denominator = self.scale() * earlier.scale();
        numerator as f64 / denominator as f64
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.value as i128 * other.scale()).cmp(&(other.value as i128 * self.scale()))
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TimestampError {
    #[error("decode time went backwards by {:.3}ms", -.delta_ms)]
    Regression { delta_ms: f64 },
}

/// Output of [`TimestampNormalizer::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedTimestamp {
    /// `pts - dts` in whole milliseconds, within the signed 24-bit range.
    pub composition_time_ms: i32,
    /// Tag timestamp relative to the session's first sample.
    pub timestamp_ms: u32,
    /// Decode time the sample was measured with (the PTS when none was given).
    pub decode_time: MediaTime,
}

/// Per-session timestamp state.
#[derive(Debug, Default)]
pub struct TimestampNormalizer {
    last_decode_time: Option<MediaTime>,
    baseline: Option<MediaTime>,
    last_timestamp_ms: u32,
}

impl TimestampNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the timestamps for a sample and accepts it in one step.
    pub fn normalize(
        &mut self,
        presentation_time: MediaTime,
        decode_time: Option<MediaTime>,
    ) -> Result<NormalizedTimestamp, TimestampError> {
        let timestamp = self.compute(presentation_time, decode_time)?;
        self.commit(&timestamp);
        Ok(timestamp)
    }

    /// Computes the timestamps for a sample without touching any state.
    /// Call [`commit`](Self::commit) once the sample was actually emitted.
    pub fn compute(
        &self,
        presentation_time: MediaTime,
        decode_time: Option<MediaTime>,
    ) -> Result<NormalizedTimestamp, TimestampError> {
        // no decode time reported: the sample decodes when it is shown
        let decode_time = decode_time.unwrap_or(presentation_time);

        let (composition_time_ms, delta_ms) = match self.last_decode_time {
            None => (0, 0.0),
            Some(last) => (
                round_composition_time(presentation_time.millis_since(decode_time)),
                decode_time.millis_since(last),
            ),
        };

        if delta_ms < 0.0 {
            return Err(TimestampError::Regression { delta_ms });
        }

        let baseline = self.baseline.unwrap_or(decode_time);
        let timestamp_ms = saturate_u32(decode_time.millis_since(baseline).round());

        Ok(NormalizedTimestamp {
            composition_time_ms,
            timestamp_ms,
            decode_time,
        })
    }

    /// Records `timestamp` as the last emitted sample. The first commit of a
    /// session fixes the baseline.
    pub fn commit(&mut self, timestamp: &NormalizedTimestamp) {
        self.baseline.get_or_insert(timestamp.decode_time);
        self.last_decode_time = Some(timestamp.decode_time);
        self.last_timestamp_ms = timestamp.timestamp_ms;
    }

    pub fn last_decode_time(&self) -> Option<MediaTime> {
        self.last_decode_time
    }

    /// Timestamp of the last accepted sample, 0 before the first one.
    pub fn last_timestamp_ms(&self) -> u32 {
        self.last_timestamp_ms
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn round_composition_time(millis: f64) -> i32 {
    millis
        .round()
        .clamp(MIN_COMPOSITION_TIME as f64, MAX_COMPOSITION_TIME as f64) as i32
}

fn saturate_u32(millis: f64) -> u32 {
    millis.clamp(0.0, u32::MAX as f64) as u32
}

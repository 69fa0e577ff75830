//! H.264 Annex-B byte stream parsing.
//!
//! [`AnnexBSplitter`] cuts an incrementally fed byte stream into NAL units
//! at `00 00 01` / `00 00 00 01` start codes. [`AccessUnitAssembler`] groups
//! those NAL units into access units and reports parameter-set changes.

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memmem;

const START_CODE: &[u8] = &[0x00, 0x00, 0x01];

pub const NAL_SLICE: u8 = 1;
pub const NAL_IDR_SLICE: u8 = 5;
pub const NAL_SEI: u8 = 6;
pub const NAL_SPS: u8 = 7;
pub const NAL_PPS: u8 = 8;
pub const NAL_AUD: u8 = 9;
pub const NAL_FILLER: u8 = 12;

pub fn nal_type(nal: &[u8]) -> Option<u8> {
    nal.first().map(|header| header & 0x1F)
}

/// Incremental start-code splitter.
#[derive(Debug, Default)]
pub struct AnnexBSplitter {
    buffer: BytesMut,
}

impl AnnexBSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `data` and returns every NAL unit that is now known to be
    /// complete, i.e. followed by another start code.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let starts: Vec<usize> = memmem::find_iter(&self.buffer, START_CODE).collect();
        let Some(&last) = starts.last() else {
            // keep a possible partial start code at the tail
            let keep = self.buffer.len().min(START_CODE.len() - 1);
            let _ = self.buffer.split_to(self.buffer.len() - keep);
            return Vec::new();
        };

        let mut units = Vec::with_capacity(starts.len().saturating_sub(1));
        let frozen = self.buffer.split_to(last).freeze();
        for pair in starts.windows(2) {
            let nal = trim_trailing_zeros(frozen.slice(pair[0] + START_CODE.len()..pair[1]));
            if !nal.is_empty() {
                units.push(nal);
            }
        }

        units
    }

    /// Returns the last NAL unit once the input has ended.
    pub fn finish(&mut self) -> Option<Bytes> {
        let buffer = std::mem::take(&mut self.buffer).freeze();
        if !buffer.starts_with(START_CODE) {
            return None;
        }
        let nal = trim_trailing_zeros(buffer.slice(START_CODE.len()..));
        (!nal.is_empty()).then_some(nal)
    }
}

// Drops the leading zero of a 4-byte start code and trailing_zero_8bits.
fn trim_trailing_zeros(nal: Bytes) -> Bytes {
    let end = nal
        .iter()
        .rposition(|byte| *byte != 0)
        .map_or(0, |pos| pos + 1);
    nal.slice(..end)
}

/// What the assembler reports, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnexBEvent {
    /// A new SPS/PPS pair is active from the next access unit on.
    ParameterSets { sps: Bytes, pps: Bytes },
    AccessUnit {
        nal_units: Vec<Bytes>,
        is_keyframe: bool,
    },
}

/// Groups NAL units into access units (ISO/IEC 14496-10 7.4.1.2.3).
///
/// A new unit starts at an AUD, SEI, SPS or PPS following a slice, or at a
/// slice whose `first_mb_in_slice` is 0 following another slice. SPS, PPS,
/// AUD and filler data are not carried in the units.
#[derive(Debug, Default)]
pub struct AccessUnitAssembler {
    current: Vec<Bytes>,
    has_slice: bool,
    is_keyframe: bool,
    sps: Option<Bytes>,
    pps: Option<Bytes>,
    announced: Option<(Bytes, Bytes)>,
}

impl AccessUnitAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, nal: Bytes) -> Vec<AnnexBEvent> {
        let mut events = Vec::new();
        let Some(nal_type) = nal_type(&nal) else {
            return events;
        };

        match nal_type {
            NAL_SLICE | NAL_IDR_SLICE => {
                // first_mb_in_slice is ue(v); a leading 1 bit means 0
                let first_slice = nal.get(1).is_some_and(|byte| byte & 0x80 != 0);
                if self.has_slice && first_slice {
                    events.extend(self.flush());
                }
                if !self.has_slice {
                    events.extend(self.announce_parameter_sets());
                }
                self.has_slice = true;
                self.is_keyframe |= nal_type == NAL_IDR_SLICE;
                self.current.push(nal);
            }
            NAL_SPS => {
                events.extend(self.flush());
                self.sps = Some(nal);
            }
            NAL_PPS => {
                events.extend(self.flush());
                self.pps = Some(nal);
            }
            NAL_AUD => events.extend(self.flush()),
            NAL_FILLER => {}
            NAL_SEI | 14..=18 => {
                events.extend(self.flush());
                self.current.push(nal);
            }
            _ => self.current.push(nal),
        }

        events
    }

    /// Emits the pending access unit at end of input.
    pub fn finish(&mut self) -> Vec<AnnexBEvent> {
        self.flush().into_iter().collect()
    }

    // Only closes a unit that already has a slice; leading SEI stays queued.
    fn flush(&mut self) -> Option<AnnexBEvent> {
        if !self.has_slice {
            return None;
        }
        self.has_slice = false;
        Some(AnnexBEvent::AccessUnit {
            nal_units: std::mem::take(&mut self.current),
            is_keyframe: std::mem::take(&mut self.is_keyframe),
        })
    }

    fn announce_parameter_sets(&mut self) -> Option<AnnexBEvent> {
        let (Some(sps), Some(pps)) = (&self.sps, &self.pps) else {
            return None;
        };
        let pair = (sps.clone(), pps.clone());
        if self.announced.as_ref() == Some(&pair) {
            return None;
        }
        self.announced = Some(pair.clone());
        Some(AnnexBEvent::ParameterSets {
            sps: pair.0,
            pps: pair.1,
        })
    }
}

/// Joins NAL units with 4-byte big-endian length prefixes.
pub fn to_avcc(nal_units: &[Bytes]) -> Bytes {
    let size = nal_units.iter().map(|nal| 4 + nal.len()).sum();
    let mut buffer = BytesMut::with_capacity(size);
    for nal in nal_units {
        buffer.put_u32(nal.len() as u32);
        buffer.put_slice(nal);
    }
    buffer.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: &[u8] = &[0x67, 0x42, 0xC0, 0x1F, 0xDA, 0x01];
    const PPS: &[u8] = &[0x68, 0xCE, 0x3C, 0x80];
    const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x21];
    const P1: &[u8] = &[0x41, 0x9A, 0x02];
    const P1_SECOND_SLICE: &[u8] = &[0x41, 0x4A, 0x03];
    const AUD: &[u8] = &[0x09, 0xF0];
    const SEI: &[u8] = &[0x06, 0x05, 0x01, 0x80];

    fn annexb(nal_units: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, nal) in nal_units.iter().enumerate() {
            // mix both start code lengths
            if i % 2 == 0 {
                out.extend_from_slice(&[0, 0, 0, 1]);
            } else {
                out.extend_from_slice(&[0, 0, 1]);
            }
            out.extend_from_slice(nal);
        }
        out
    }

    fn split_all(data: &[u8], chunk: usize) -> Vec<Bytes> {
        let mut splitter = AnnexBSplitter::new();
        let mut units = Vec::new();
        for piece in data.chunks(chunk) {
            units.extend(splitter.push(piece));
        }
        units.extend(splitter.finish());
        units
    }

    #[test]
    fn test_split_start_codes() {
        let data = annexb(&[SPS, PPS, IDR, P1]);
        let units = split_all(&data, data.len());

        assert_eq!(units, vec![
            Bytes::from_static(SPS),
            Bytes::from_static(PPS),
            Bytes::from_static(IDR),
            Bytes::from_static(P1),
        ]);
    }

    #[test]
    fn test_split_across_chunk_boundaries() {
        let data = annexb(&[SPS, PPS, IDR, P1, P1_SECOND_SLICE]);
        let whole = split_all(&data, data.len());

        for chunk in 1..8 {
            assert_eq!(split_all(&data, chunk), whole, "chunk size {chunk}");
        }
    }

    #[test]
    fn test_split_ignores_leading_garbage() {
        let mut data = vec![0xFF, 0xEE];
        data.extend(annexb(&[IDR]));
        assert_eq!(split_all(&data, 3), vec![Bytes::from_static(IDR)]);
    }

    #[test]
    fn test_assemble_access_units() {
        let mut assembler = AccessUnitAssembler::new();
        let mut events = Vec::new();
        for nal in [SPS, PPS, IDR, P1, P1_SECOND_SLICE, AUD, P1] {
            events.extend(assembler.push(Bytes::from_static(nal)));
        }
        events.extend(assembler.finish());

        assert_eq!(events, vec![
            AnnexBEvent::ParameterSets {
                sps: Bytes::from_static(SPS),
                pps: Bytes::from_static(PPS),
            },
            AnnexBEvent::AccessUnit {
                nal_units: vec![Bytes::from_static(IDR)],
                is_keyframe: true,
            },
            AnnexBEvent::AccessUnit {
                nal_units: vec![Bytes::from_static(P1), Bytes::from_static(P1_SECOND_SLICE)],
                is_keyframe: false,
            },
            AnnexBEvent::AccessUnit {
                nal_units: vec![Bytes::from_static(P1)],
                is_keyframe: false,
            },
        ]);
    }

    #[test]
    fn test_repeated_parameter_sets_announced_once() {
        let mut assembler = AccessUnitAssembler::new();
        let mut events = Vec::new();
        for nal in [SPS, PPS, IDR, SPS, PPS, IDR] {
            events.extend(assembler.push(Bytes::from_static(nal)));
        }
        events.extend(assembler.finish());

        let announcements = events
            .iter()
            .filter(|e| matches!(e, AnnexBEvent::ParameterSets { .. }))
            .count();
        assert_eq!(announcements, 1);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_sei_joins_following_unit() {
        let mut assembler = AccessUnitAssembler::new();
        let mut events = Vec::new();
        for nal in [IDR, SEI, P1] {
            events.extend(assembler.push(Bytes::from_static(nal)));
        }
        events.extend(assembler.finish());

        assert_eq!(
            events.last(),
            Some(&AnnexBEvent::AccessUnit {
                nal_units: vec![Bytes::from_static(SEI), Bytes::from_static(P1)],
                is_keyframe: false,
            })
        );
    }

    #[test]
    fn test_to_avcc() {
        let avcc = to_avcc(&[Bytes::from_static(&[0x65, 0x01]), Bytes::from_static(&[0x41])]);
        assert_eq!(
            avcc.as_ref(),
            &[0, 0, 0, 2, 0x65, 0x01, 0, 0, 0, 1, 0x41]
        );
    }
}

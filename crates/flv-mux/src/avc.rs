use std::fmt;
use std::io::{self, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

/// The AVC (H.264) Decoder Configuration Record, the payload of an FLV
/// sequence-header tag.
///
/// ISO/IEC 14496-15:2022(E) - 5.3.2.1.2
#[derive(Debug, Clone, PartialEq)]
pub struct AvcDecoderConfigurationRecord {
    /// Always 1.
    pub configuration_version: u8,
    /// `profile_idc` of the SPS.
    pub profile_indication: u8,
    /// The constraint-flag byte that follows `profile_idc` in the SPS.
    pub profile_compatibility: u8,
    /// `level_idc` of the SPS.
    pub level_indication: u8,
    /// Size of the NAL unit length prefix minus one (3 for 4-byte AVCC).
    pub length_size_minus_one: u8,
    /// SPS NAL units, ascending SPS id.
    pub sps: Vec<Bytes>,
    /// PPS NAL units, ascending PPS id.
    pub pps: Vec<Bytes>,
    /// Trailing chroma/bit-depth block some high-profile records carry.
    pub extended_config: Option<AvcExtendedConfig>,
}

/// ISO/IEC 14496-15:2022(E) - 5.3.2.1.2, present for profiles other than 66, 77, 88.
#[derive(Debug, Clone, PartialEq)]
pub struct AvcExtendedConfig {
    pub chroma_format_idc: u8,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub sequence_parameter_set_ext: Vec<Bytes>,
}

impl AvcDecoderConfigurationRecord {
    /// Assembles a record from raw parameter sets (without start codes).
    ///
    /// Profile, compatibility and level are copied from the first SPS.
    /// Returns `None` if either list is empty or the SPS is too short to
    /// carry them.
    pub fn from_parameter_sets(sps: Vec<Bytes>, pps: Vec<Bytes>) -> Option<Self> {
        let first = sps.first()?;
        if first.len() < 4 || pps.is_empty() {
            return None;
        }

        Some(Self {
            configuration_version: 1,
            profile_indication: first[1],
            profile_compatibility: first[2],
            level_indication: first[3],
            length_size_minus_one: 3,
            sps,
            pps,
            extended_config: None,
        })
    }

    pub fn parse(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let configuration_version = reader.read_u8()?;
        let profile_indication = reader.read_u8()?;
        let profile_compatibility = reader.read_u8()?;
        let level_indication = reader.read_u8()?;
        let length_size_minus_one = reader.read_u8()? & 0b0000_0011;

        let num_of_sequence_parameter_sets = reader.read_u8()? & 0b0001_1111;
        let sps = read_parameter_sets(reader, num_of_sequence_parameter_sets as usize)?;

        let num_of_picture_parameter_sets = reader.read_u8()?;
        let pps = read_parameter_sets(reader, num_of_picture_parameter_sets as usize)?;

        // Encoders routinely leave the extension out even for high profiles,
        // so it is only read when bytes remain.
        let has_more = (reader.position() as usize) < reader.get_ref().len();
        let extended_config = match profile_indication {
            66 | 77 | 88 => None,
            _ if has_more => {
                let chroma_format_idc = reader.read_u8()? & 0b0000_0011;
                let bit_depth_luma_minus8 = reader.read_u8()? & 0b0000_0111;
                let bit_depth_chroma_minus8 = reader.read_u8()? & 0b0000_0111;
                let count = reader.read_u8()?;
                Some(AvcExtendedConfig {
                    chroma_format_idc,
                    bit_depth_luma_minus8,
                    bit_depth_chroma_minus8,
                    sequence_parameter_set_ext: read_parameter_sets(reader, count as usize)?,
                })
            }
            _ => None,
        };

        Ok(Self {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size_minus_one,
            sps,
            pps,
            extended_config,
        })
    }

    pub fn build<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.sps.len() > 0b1_1111 || self.pps.len() > u8::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "too many parameter sets for an AVC configuration record",
            ));
        }

        writer.write_u8(self.configuration_version)?;
        writer.write_u8(self.profile_indication)?;
        writer.write_u8(self.profile_compatibility)?;
        writer.write_u8(self.level_indication)?;
        writer.write_u8(0b1111_1100 | (self.length_size_minus_one & 0b11))?;

        writer.write_u8(0b1110_0000 | self.sps.len() as u8)?;
        write_parameter_sets(writer, &self.sps)?;

        writer.write_u8(self.pps.len() as u8)?;
        write_parameter_sets(writer, &self.pps)?;

        if let Some(config) = &self.extended_config {
            writer.write_u8(0b1111_1100 | (config.chroma_format_idc & 0b11))?;
            writer.write_u8(0b1111_1000 | (config.bit_depth_luma_minus8 & 0b111))?;
            writer.write_u8(0b1111_1000 | (config.bit_depth_chroma_minus8 & 0b111))?;
            writer.write_u8(config.sequence_parameter_set_ext.len() as u8)?;
            write_parameter_sets(writer, &config.sequence_parameter_set_ext)?;
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> io::Result<Bytes> {
        let mut buffer = Vec::with_capacity(self.size());
        self.build(&mut buffer)?;
        Ok(Bytes::from(buffer))
    }

    /// Total serialized size in bytes.
    pub fn size(&self) -> usize {
        let sets = |sets: &[Bytes]| sets.iter().map(|s| 2 + s.len()).sum::<usize>();

        6 + sets(&self.sps)
            + 1
            + sets(&self.pps)
            + self
                .extended_config
                .as_ref()
                .map_or(0, |config| 4 + sets(&config.sequence_parameter_set_ext))
    }
}

impl fmt::Display for AvcDecoderConfigurationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AVC [Profile: {}, Compatibility: {:#04x}, Level: {}, SPS: {}, PPS: {}]",
            self.profile_indication,
            self.profile_compatibility,
            self.level_indication,
            self.sps.len(),
            self.pps.len()
        )
    }
}

fn read_parameter_sets(reader: &mut io::Cursor<Bytes>, count: usize) -> io::Result<Vec<Bytes>> {
    let mut sets = Vec::with_capacity(count);
    for _ in 0..count {
        let len = reader.read_u16::<BigEndian>()? as usize;
        let start = reader.position() as usize;
        if start + len > reader.get_ref().len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "parameter set truncated",
            ));
        }
        sets.push(reader.get_ref().slice(start..start + len));
        reader.set_position((start + len) as u64);
    }
    Ok(sets)
}

fn write_parameter_sets<W: Write>(writer: &mut W, sets: &[Bytes]) -> io::Result<()> {
    for set in sets {
        let len = u16::try_from(set.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "parameter set too long"))?;
        writer.write_u16::<BigEndian>(len)?;
        writer.write_all(set)?;
    }
    Ok(())
}

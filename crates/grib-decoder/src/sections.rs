//! GRIB2 section walking and Section 3 (grid definition) parsing.
//!
//! Each GRIB2 message starts with a 16-byte indicator carrying the total
//! message length, followed by length-prefixed sections numbered 1..=7 and
//! the `7777` end marker.

use crate::error::{DecodeError, DecodeResult};

const INDICATOR_LEN: usize = 16;
const END_MARKER: &[u8; 4] = b"7777";

/// Grid definition of one message, closed over the templates the loader understands.
#[derive(Debug, Clone, PartialEq)]
pub enum GridDefinition {
    /// Template 3.0: regular latitude/longitude grid.
    LatLon(LatLonGrid),
    /// Any other template, kept only for error reporting.
    Other { template: u16 },
}

impl GridDefinition {
    pub fn template(&self) -> u16 {
        match self {
            GridDefinition::LatLon(_) => 0,
            GridDefinition::Other { template } => *template,
        }
    }
}

/// Template 3.0 fields. Angles are in microdegrees as encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatLonGrid {
    /// Points along a parallel
    pub ni: u32,
    /// Points along a meridian
    pub nj: u32,
    pub la1: i32,
    pub lo1: i32,
    pub la2: i32,
    pub lo2: i32,
    /// i direction increment
    pub di: u32,
    /// j direction increment
    pub dj: u32,
    pub scanning_mode: u8,
}

impl LatLonGrid {
    pub fn num_points(&self) -> usize {
        self.ni as usize * self.nj as usize
    }

    /// Latitude of the first grid point in degrees.
    pub fn first_lat(&self) -> f64 {
        self.la1 as f64 * 1e-6
    }

    /// Longitude of the first grid point in degrees.
    pub fn first_lng(&self) -> f64 {
        self.lo1 as f64 * 1e-6
    }

    /// Longitude spacing in degrees.
    pub fn lng_step(&self) -> f64 {
        self.di as f64 * 1e-6
    }

    /// Latitude spacing in degrees, always positive.
    pub fn lat_step(&self) -> f64 {
        self.dj as f64 * 1e-6
    }

    /// True when rows run south to north (scanning mode bit 2, `+j`).
    pub fn scans_northward(&self) -> bool {
        self.scanning_mode & 0b0100_0000 != 0
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// GRIB2 encodes negative angles as sign-and-magnitude, not two's complement.
fn read_signed_i32(buf: &[u8], at: usize) -> i32 {
    let raw = read_u32(buf, at);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Split a buffer holding one or more concatenated GRIB2 messages.
pub fn split_messages(data: &[u8]) -> DecodeResult<Vec<&[u8]>> {
    let mut messages = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let rest = &data[offset..];
        if rest.len() < INDICATOR_LEN {
            return Err(DecodeError::InvalidFormat(
                "Not enough data for indicator section".to_string(),
            ));
        }
        if &rest[0..4] != b"GRIB" {
            return Err(DecodeError::InvalidFormat(format!(
                "Invalid GRIB magic bytes at offset {}",
                offset
            )));
        }
        if rest[7] != 2 {
            return Err(DecodeError::InvalidFormat(format!(
                "Expected GRIB edition 2, got {}",
                rest[7]
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&rest[8..16]);
        let length = u64::from_be_bytes(len_bytes) as usize;
        if length < INDICATOR_LEN + END_MARKER.len() || length > rest.len() {
            return Err(DecodeError::InvalidFormat(format!(
                "Message at offset {} declares {} bytes, {} available",
                offset,
                length,
                rest.len()
            )));
        }
        if &rest[length - 4..length] != END_MARKER {
            return Err(DecodeError::InvalidFormat(format!(
                "Message at offset {} is missing its end marker",
                offset
            )));
        }

        messages.push(&rest[..length]);
        offset += length;
    }

    Ok(messages)
}

/// Byte offset of the given section inside a single message.
pub fn find_section(message: &[u8], section_num: u8) -> DecodeResult<usize> {
    let mut offset = INDICATOR_LEN;

    loop {
        if offset + 5 > message.len() {
            return Err(DecodeError::InvalidSection {
                section: section_num,
                reason: "Section not found".to_string(),
            });
        }
        if &message[offset..offset + 4] == END_MARKER {
            return Err(DecodeError::InvalidSection {
                section: section_num,
                reason: "Reached end of message without finding section".to_string(),
            });
        }

        let section_length = read_u32(message, offset) as usize;
        if section_length < 5 || offset + section_length > message.len() {
            return Err(DecodeError::InvalidSection {
                section: section_num,
                reason: "Invalid section length".to_string(),
            });
        }

        if message[offset + 4] == section_num {
            return Ok(offset);
        }

        offset += section_length;
    }
}

/// Parse Section 3 of a single message.
pub fn parse_grid_definition(message: &[u8]) -> DecodeResult<GridDefinition> {
    let offset = find_section(message, 3)?;
    let section_length = read_u32(message, offset) as usize;
    let section = &message[offset..offset + section_length];

    if section.len() < 14 {
        return Err(DecodeError::InvalidSection {
            section: 3,
            reason: "Not enough data".to_string(),
        });
    }

    // Octets 13-14 carry the template number; template data follows.
    let template = u16::from_be_bytes([section[12], section[13]]);
    if template != 0 {
        return Ok(GridDefinition::Other { template });
    }

    let gd = &section[14..];
    if gd.len() < 58 {
        return Err(DecodeError::InvalidSection {
            section: 3,
            reason: format!("Template 0 needs at least 58 bytes, got {}", gd.len()),
        });
    }

    Ok(GridDefinition::LatLon(LatLonGrid {
        ni: read_u32(gd, 16),
        nj: read_u32(gd, 20),
        la1: read_signed_i32(gd, 32),
        lo1: read_signed_i32(gd, 36),
        la2: read_signed_i32(gd, 41),
        lo2: read_signed_i32(gd, 45),
        di: read_u32(gd, 49),
        dj: read_u32(gd, 53),
        scanning_mode: gd[57],
    }))
}

//! On-disk layout of the persistent region.
//!
//! ```text
//! | record | record | ... | footer (12 bytes) |<- region end
//! record = id (1) | size (2, BE) | payload (size bytes)
//! footer = owner (1) | application (1) | version (2) | stream size (2) | checksum (2) | magic (4)
//! ```
//!
//! The stream is written backwards from the region end so the footer
//! always sits in the last 12 bytes. All multi-byte fields are big-endian.

use crate::hal::DeviceIdentity;

/// id byte + size word in front of every payload
pub const RECORD_HEADER_LEN: usize = 3;

pub const FOOTER_LEN: usize = 12;

/// Offset of the checksum field inside the footer. Everything before it
/// is covered by the checksum.
pub const CHECKSUM_OFFSET: usize = 6;

pub const MAGIC_OFFSET: usize = 8;

pub const MAGIC_LEN: usize = 4;

/// Marker proving a save ran to completion
pub const MAGIC: u32 = 0x4B45_454C;

/// Value of erased flash, also used to pad short records
pub const ERASED: u8 = 0xFF;

/// Trailer of a completed save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub owner_id: u8,
    pub application_number: u8,
    pub application_version: u16,
    /// Length of the record stream, headers included
    pub stream_len: u16,
    pub checksum: u16,
}

impl Footer {
    pub fn new(identity: DeviceIdentity, stream_len: u16) -> Self {
        Self {
            owner_id: identity.owner_id,
            application_number: identity.application_number,
            application_version: identity.application_version,
            stream_len,
            checksum: 0,
        }
    }

    pub fn encode(&self) -> [u8; FOOTER_LEN] {
        let mut out = [0u8; FOOTER_LEN];
        out[0] = self.owner_id;
        out[1] = self.application_number;
        out[2..4].copy_from_slice(&self.application_version.to_be_bytes());
        out[4..6].copy_from_slice(&self.stream_len.to_be_bytes());
        out[6..8].copy_from_slice(&self.checksum.to_be_bytes());
        out[8..12].copy_from_slice(&MAGIC.to_be_bytes());
        out
    }

    /// None unless the trailing magic marker is present
    pub fn decode(bytes: &[u8; FOOTER_LEN]) -> Option<Self> {
        let magic = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        if magic != MAGIC {
            return None;
        }

        Some(Self {
            owner_id: bytes[0],
            application_number: bytes[1],
            application_version: u16::from_be_bytes([bytes[2], bytes[3]]),
            stream_len: u16::from_be_bytes([bytes[4], bytes[5]]),
            checksum: u16::from_be_bytes([bytes[6], bytes[7]]),
        })
    }
}

/// 16-bit additive checksum. Not a CRC: catches single-byte damage and
/// truncation, nothing stronger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u16);

impl Checksum {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn add(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_add(b as u16);
        }
    }

    /// Same as adding `count` copies of `value`
    pub fn add_repeated(&mut self, value: u8, count: usize) {
        let sum = (value as u64 * count as u64) & 0xFFFF;
        self.0 = self.0.wrapping_add(sum as u16);
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

pub fn checksum(bytes: &[u8]) -> u16 {
    let mut sum = Checksum::new();
    sum.add(bytes);
    sum.value()
}

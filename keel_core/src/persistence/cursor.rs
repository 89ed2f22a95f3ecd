use super::layout::{Checksum, ERASED};
use super::region::PersistentRegion;
use crate::error::{KeelError, KeelResult};

/// Write cursor confined to one window of the persistent region.
///
/// The engine hands each module a writer covering exactly its declared
/// size. Any write that would cross the end of the window is rejected as a
/// whole and logged; nothing past the window is ever touched. Every
/// accepted byte is folded into the running checksum.
pub struct StateWriter<'a> {
    region: &'a mut dyn PersistentRegion,
    checksum: &'a mut Checksum,
    module_id: u8,
    start: usize,
    cursor: usize,
    end: usize,
    rejected: usize,
}

impl<'a> StateWriter<'a> {
    pub(crate) fn new(
        region: &'a mut dyn PersistentRegion,
        checksum: &'a mut Checksum,
        module_id: u8,
        start: usize,
        len: usize,
    ) -> Self {
        Self {
            region,
            checksum,
            module_id,
            start,
            cursor: start,
            end: start + len,
            rejected: 0,
        }
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> KeelResult<()> {
        let remaining = self.remaining();
        if data.len() > remaining {
            self.rejected += 1;
            log::warn!(
                target: "keel::flash",
                "write not allowed: module {} wants {} bytes, {} left",
                self.module_id,
                data.len(),
                remaining
            );
            return Err(KeelError::WriteOverflow {
                module_id: self.module_id,
                requested: data.len(),
                remaining,
            });
        }

        self.cursor = self.region.write_bytes(self.cursor, data)?;
        self.checksum.add(data);
        Ok(())
    }

    pub fn write_byte(&mut self, value: u8) -> KeelResult<()> {
        self.write_bytes(&[value])
    }

    /// u16, big-endian
    pub fn write_word(&mut self, value: u16) -> KeelResult<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// u32, big-endian
    pub fn write_int(&mut self, value: u32) -> KeelResult<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn remaining(&self) -> usize {
        self.end - self.cursor
    }

    pub fn written(&self) -> usize {
        self.cursor - self.start
    }

    pub fn module_id(&self) -> u8 {
        self.module_id
    }

    /// Writes refused because they would overflow the window
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Fill the rest of the window with the erase value. Returns the
    /// number of padding bytes.
    pub(crate) fn pad(&mut self) -> KeelResult<usize> {
        let fill = self.remaining();
        if fill == 0 {
            return Ok(0);
        }
        self.cursor = self.region.fill(self.cursor, ERASED, fill)?;
        self.checksum.add_repeated(ERASED, fill);
        Ok(fill)
    }
}

/// Read cursor over a restored record.
///
/// Reads past the end return `None` instead of panicking, so a module
/// restoring from an older, shorter record can fall back to defaults
/// field by field.
#[derive(Debug, Clone)]
pub struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// u16, big-endian
    pub fn read_word(&mut self) -> Option<u16> {
        self.read_bytes(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// u32, big-endian
    pub fn read_int(&mut self) -> Option<u32> {
        self.read_bytes(4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

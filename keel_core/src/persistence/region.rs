// Byte-addressable non-volatile regions
use super::layout::ERASED;
use crate::error::{KeelError, KeelResult};
use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A fixed-size non-volatile byte range.
///
/// Addresses are offsets from the start of the region. Nothing is assumed
/// about the atomicity of partial writes; durability is only guaranteed
/// after [`PersistentRegion::commit`].
pub trait PersistentRegion: Send {
    fn size(&self) -> usize;

    fn read_bytes(&self, address: usize, len: usize) -> KeelResult<Vec<u8>>;

    /// Write `data` at `address`, returning the address after the last byte
    fn write_bytes(&mut self, address: usize, data: &[u8]) -> KeelResult<usize>;

    /// Write `len` copies of `value` at `address`
    fn fill(&mut self, address: usize, value: u8, len: usize) -> KeelResult<usize> {
        self.write_bytes(address, &vec![value; len])
    }

    /// Flush pending writes to the medium
    fn commit(&mut self) -> KeelResult<()>;
}

fn check_range(address: usize, len: usize, size: usize) -> KeelResult<()> {
    match address.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(KeelError::storage(format!(
            "access {}..{} outside region of {} bytes",
            address,
            address.saturating_add(len),
            size
        ))),
    }
}

#[derive(Debug)]
struct MemoryState {
    bytes: Vec<u8>,
    commits: usize,
}

/// RAM-backed region.
///
/// Clones share the same bytes, so a handle kept outside the engine can
/// inspect or damage the contents and a second engine built from a clone
/// sees what the first one wrote (a reboot on the same flash).
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryRegion {
    /// A freshly erased region of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                bytes: vec![ERASED; size],
                commits: 0,
            })),
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().bytes.clone()
    }

    /// Overwrite one byte without going through the engine
    pub fn poke(&self, address: usize, value: u8) {
        let mut state = self.inner.lock();
        if let Some(b) = state.bytes.get_mut(address) {
            *b = value;
        }
    }

    pub fn peek(&self, address: usize) -> Option<u8> {
        self.inner.lock().bytes.get(address).copied()
    }

    pub fn erase(&self) {
        self.inner.lock().bytes.fill(ERASED);
    }

    /// Number of completed commits, i.e. physical writes
    pub fn commits(&self) -> usize {
        self.inner.lock().commits
    }
}

impl PersistentRegion for MemoryRegion {
    fn size(&self) -> usize {
        self.inner.lock().bytes.len()
    }

    fn read_bytes(&self, address: usize, len: usize) -> KeelResult<Vec<u8>> {
        let state = self.inner.lock();
        check_range(address, len, state.bytes.len())?;
        Ok(state.bytes[address..address + len].to_vec())
    }

    fn write_bytes(&mut self, address: usize, data: &[u8]) -> KeelResult<usize> {
        let mut state = self.inner.lock();
        check_range(address, data.len(), state.bytes.len())?;
        state.bytes[address..address + data.len()].copy_from_slice(data);
        Ok(address + data.len())
    }

    fn fill(&mut self, address: usize, value: u8, len: usize) -> KeelResult<usize> {
        let mut state = self.inner.lock();
        check_range(address, len, state.bytes.len())?;
        state.bytes[address..address + len].fill(value);
        Ok(address + len)
    }

    fn commit(&mut self) -> KeelResult<()> {
        self.inner.lock().commits += 1;
        Ok(())
    }
}

/// Region backed by a memory-mapped file, standing in for a flash
/// partition when the firmware runs on a host
#[derive(Debug)]
pub struct FileRegion {
    mmap: MmapMut,
    path: PathBuf,
    _file: File,
}

impl FileRegion {
    /// Open `path`, creating and erasing it if it does not exist yet.
    /// An existing file shorter than `size` is extended with erased bytes.
    pub fn open<P: AsRef<Path>>(path: P, size: usize) -> KeelResult<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let old_len = file.metadata()?.len() as usize;
        if old_len < size {
            file.set_len(size as u64)?;
        }

        let mut mmap = unsafe { MmapOptions::new().len(size).map_mut(&file)? };

        if !existed {
            mmap.fill(ERASED);
        } else if old_len < size {
            mmap[old_len..].fill(ERASED);
        }

        log::debug!(
            target: "keel::flash",
            "opened region {} ({} bytes, {})",
            path.display(),
            size,
            if existed { "existing" } else { "new" }
        );

        Ok(Self {
            mmap,
            path,
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistentRegion for FileRegion {
    fn size(&self) -> usize {
        self.mmap.len()
    }

    fn read_bytes(&self, address: usize, len: usize) -> KeelResult<Vec<u8>> {
        check_range(address, len, self.mmap.len())?;
        Ok(self.mmap[address..address + len].to_vec())
    }

    fn write_bytes(&mut self, address: usize, data: &[u8]) -> KeelResult<usize> {
        check_range(address, data.len(), self.mmap.len())?;
        self.mmap[address..address + data.len()].copy_from_slice(data);
        Ok(address + data.len())
    }

    fn fill(&mut self, address: usize, value: u8, len: usize) -> KeelResult<usize> {
        check_range(address, len, self.mmap.len())?;
        self.mmap[address..address + len].fill(value);
        Ok(address + len)
    }

    fn commit(&mut self) -> KeelResult<()> {
        self.mmap.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_region_bounds() {
        let mut region = MemoryRegion::new(16);
        assert_eq!(region.write_bytes(14, &[1, 2]).unwrap(), 16);
        assert!(region.write_bytes(15, &[1, 2]).is_err());
        assert!(region.read_bytes(10, 7).is_err());
        assert_eq!(region.read_bytes(13, 3).unwrap(), vec![ERASED, 1, 2]);
    }

    #[test]
    fn test_memory_region_clones_share_bytes() {
        let mut region = MemoryRegion::new(8);
        let observer = region.clone();
        region.write_bytes(0, &[7]).unwrap();
        region.commit().unwrap();
        assert_eq!(observer.peek(0), Some(7));
        assert_eq!(observer.commits(), 1);
    }

    #[test]
    fn test_file_region_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.bin");

        {
            let mut region = FileRegion::open(&path, 64).unwrap();
            assert_eq!(region.read_bytes(0, 4).unwrap(), vec![ERASED; 4]);
            region.write_bytes(60, &[1, 2, 3, 4]).unwrap();
            region.commit().unwrap();
        }

        let region = FileRegion::open(&path, 64).unwrap();
        assert_eq!(region.read_bytes(60, 4).unwrap(), vec![1, 2, 3, 4]);
    }
}

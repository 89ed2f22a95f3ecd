//! Shared fixtures for the keel benchmarks

use keel::prelude::*;

/// Identity every benchmark device reports
pub const BENCH_IDENTITY: DeviceIdentity = DeviceIdentity {
    owner_id: 0xFA,
    application_number: 0x42,
    application_version: 1,
};

/// Module persisting a fixed-size pattern
pub struct BlobModule {
    name: String,
    data: Vec<u8>,
    ticks: u64,
}

impl BlobModule {
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            data: (0..size).map(|i| (i & 0xFF) as u8).collect(),
            ticks: 0,
        }
    }
}

impl Module for BlobModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_size(&self) -> u16 {
        self.data.len() as u16
    }

    fn restore_state(&mut self, data: &[u8]) {
        if data.len() == self.data.len() {
            self.data.copy_from_slice(data);
        }
    }

    fn persist_state(&self, writer: &mut StateWriter<'_>) -> Result<()> {
        writer.write_bytes(&self.data)
    }

    fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }
}

/// Registry of `count` modules with `size` bytes of state each
pub fn build_registry(count: u8, size: usize) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::with_capacity(count as usize);
    for id in 1..=count {
        registry.register(id, Box::new(BlobModule::new(&format!("blob{}", id), size)))?;
    }
    Ok(registry)
}

/// Region large enough for `count` records of `size` bytes plus the footer
pub fn region_for(count: u8, size: usize) -> MemoryRegion {
    let stream = count as usize * (keel::persistence::RECORD_HEADER_LEN + size);
    MemoryRegion::new(stream + keel::persistence::FOOTER_LEN + 64)
}

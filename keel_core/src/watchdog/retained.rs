// Memory that survives a reset but not a power loss
use parking_lot::Mutex;
use std::sync::Arc;

/// Running-state value meaning "watchdog armed, no clean shutdown yet"
pub const RUNNING_SENTINEL: u8 = 0xA6;

/// Small store kept in RAM the startup code does not clear.
///
/// On hardware this is an uninitialized / no-init linker section. Its
/// content is undefined after power-up; the watchdog tracker overwrites
/// the counter on every boot that was not a crash reset.
pub trait RetainedStore: Send + Sync {
    fn restart_count(&self) -> u8;

    fn set_restart_count(&self, count: u8);

    fn running_state(&self) -> u8;

    fn set_running_state(&self, state: u8);
}

#[derive(Debug, Default)]
struct RetainedCells {
    restart_count: u8,
    running_state: u8,
}

/// In-process retained store.
///
/// Clones share the cells: keep one handle across simulated reboots and
/// call [`RetainedMemory::power_cycle`] to model a power loss.
#[derive(Debug, Clone, Default)]
pub struct RetainedMemory {
    cells: Arc<Mutex<RetainedCells>>,
}

impl RetainedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn power_cycle(&self) {
        *self.cells.lock() = RetainedCells::default();
    }
}

impl RetainedStore for RetainedMemory {
    fn restart_count(&self) -> u8 {
        self.cells.lock().restart_count
    }

    fn set_restart_count(&self, count: u8) {
        self.cells.lock().restart_count = count;
    }

    fn running_state(&self) -> u8 {
        self.cells.lock().running_state
    }

    fn set_running_state(&self, state: u8) {
        self.cells.lock().running_state = state;
    }
}

// Collaborator interfaces the core consumes from the platform

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identity of the running firmware, stamped into every save footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub owner_id: u8,
    pub application_number: u8,
    pub application_version: u16,
}

impl DeviceIdentity {
    pub fn new(owner_id: u8, application_number: u8, application_version: u16) -> Self {
        Self {
            owner_id,
            application_number,
            application_version,
        }
    }

    /// Stored data is only applied when owner and application match.
    /// The version may differ; modules migrate their own payloads.
    pub fn accepts(&self, owner_id: u8, application_number: u8) -> bool {
        self.owner_id == owner_id && self.application_number == application_number
    }
}

/// View of the communication bus stack
pub trait BusInterface: Send {
    /// False while the device is being commissioned
    fn is_configured(&self) -> bool;

    fn device_identity(&self) -> DeviceIdentity;
}

/// Bus stand-in with a fixed identity and a shareable configured flag
#[derive(Debug, Clone)]
pub struct StaticBus {
    identity: DeviceIdentity,
    configured: Arc<AtomicBool>,
}

impl StaticBus {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            configured: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::SeqCst);
    }
}

impl BusInterface for StaticBus {
    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    fn device_identity(&self) -> DeviceIdentity {
        self.identity
    }
}

/// Free heap probe used for the running minimum diagnostic
pub trait MemoryProbe: Send {
    /// None when the platform cannot tell
    fn free_memory(&self) -> Option<usize>;
}

/// Probe for platforms without heap statistics
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMemoryProbe;

impl MemoryProbe for NoMemoryProbe {
    fn free_memory(&self) -> Option<usize> {
        None
    }
}

/// Reads `MemAvailable` from /proc/meminfo
#[cfg(target_os = "linux")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcMemoryProbe;

#[cfg(target_os = "linux")]
impl MemoryProbe for ProcMemoryProbe {
    fn free_memory(&self) -> Option<usize> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        let line = meminfo.lines().find(|l| l.starts_with("MemAvailable:"))?;
        let kb: usize = line.split_whitespace().nth(1)?.parse().ok()?;
        Some(kb * 1024)
    }
}

//! # Keel
//!
//! Reliability core for modular device firmware: a module registry, flash
//! persistence with power-fail safety, and watchdog restart tracking.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keel::prelude::*;
//!
//! struct Blink {
//!     on: bool,
//! }
//!
//! impl Module for Blink {
//!     fn name(&self) -> &str { "blink" }
//!
//!     fn tick(&mut self) {
//!         self.on = !self.on;
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let bus = StaticBus::new(DeviceIdentity::new(0xFA, 0x01, 1));
//!     let region = FileRegion::open("keel.flash", 4096)?;
//!     let platform = Platform::new(Box::new(bus), Box::new(region));
//!
//!     let mut orchestrator = Orchestrator::new(OrchestratorConfig::standard(), platform);
//!     orchestrator.add(1, Box::new(Blink { on: false }))?;
//!     orchestrator.run()?;
//!     Ok(())
//! }
//! ```

// Re-export core components
pub use keel_core::{self, *};

// Re-export the crates modules and integrators share with the core
pub use anyhow;
pub use log;
pub use serde;
pub use thiserror;

/// The keel prelude - everything a module or an integrator needs
pub mod prelude {
    // Module contract
    pub use keel_core::core::{Module, ModuleMetrics, ModuleRegistry, ModuleState};

    // Persistence
    pub use keel_core::persistence::{
        FileRegion, LoadOutcome, MemoryRegion, PersistentRegion, SaveOutcome, StateReader,
        StateWriter,
    };

    // Platform collaborators
    pub use keel_core::hal::{BusInterface, DeviceIdentity, StaticBus};
    pub use keel_core::watchdog::{
        HardwareWatchdog, ResetCause, RetainedMemory, RetainedStore, SentinelResetCause,
        SoftwareWatchdog,
    };

    // Scheduling
    pub use keel_core::scheduling::{Orchestrator, OrchestratorConfig, Platform, SaveTrigger};

    // Error types
    pub use keel_core::error::{KeelError, KeelResult};
    pub type Result<T> = KeelResult<T>;

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::Duration;

    pub use anyhow::{anyhow, bail, ensure, Context, Result as AnyResult};
}

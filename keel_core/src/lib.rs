//! # Keel Core
//!
//! Reliability core for modular device firmware. A device is composed of
//! independently developed modules; keel owns them, decides when they run
//! and keeps their state across power loss.
//!
//! - **Modules**: the [`Module`] contract and an id-keyed registry
//! - **Persistence**: one checksummed record stream per device in a
//!   non-volatile region, rate limited and validated before use
//! - **Watchdog**: hardware liveness pulse plus a restart counter kept in
//!   retained memory
//! - **Scheduling**: the [`Orchestrator`] driving boot, setup and the main
//!   loop, with an optional secondary execution context
//!
//! ## Quick Start
//!
//! ```rust
//! use keel_core::hal::{DeviceIdentity, StaticBus};
//! use keel_core::persistence::{MemoryRegion, StateWriter};
//! use keel_core::scheduling::{Orchestrator, OrchestratorConfig, Platform};
//! use keel_core::{KeelResult, Module};
//!
//! struct Counter {
//!     value: u32,
//! }
//!
//! impl Module for Counter {
//!     fn name(&self) -> &str { "counter" }
//!
//!     fn state_size(&self) -> u16 { 4 }
//!
//!     fn restore_state(&mut self, data: &[u8]) {
//!         if let Ok(bytes) = <[u8; 4]>::try_from(data) {
//!             self.value = u32::from_be_bytes(bytes);
//!         }
//!     }
//!
//!     fn persist_state(&self, writer: &mut StateWriter<'_>) -> KeelResult<()> {
//!         writer.write_int(self.value)
//!     }
//!
//!     fn tick(&mut self) {
//!         self.value += 1;
//!     }
//! }
//!
//! let bus = StaticBus::new(DeviceIdentity::new(0xFA, 0x01, 1));
//! let platform = Platform::new(Box::new(bus), Box::new(MemoryRegion::new(256)));
//! let mut orchestrator = Orchestrator::new(OrchestratorConfig::testing(), platform);
//! orchestrator.add(1, Box::new(Counter { value: 0 })).unwrap();
//! orchestrator.init().unwrap();
//! orchestrator.setup();
//! orchestrator.loop_once().unwrap();
//! ```

pub mod core;
pub mod diagnostics;
pub mod error;
pub mod hal;
pub mod persistence;
pub mod scheduling;
pub mod watchdog;

// Re-export commonly used types for easy access
pub use core::{Module, ModuleRegistry, ModuleState};
pub use error::{KeelError, KeelResult};
pub use hal::{BusInterface, DeviceIdentity};
pub use persistence::{LoadOutcome, PersistenceEngine, SaveOutcome, StateReader, StateWriter};
pub use scheduling::{Orchestrator, OrchestratorConfig, Platform, SaveTrigger};
pub use watchdog::WatchdogTracker;

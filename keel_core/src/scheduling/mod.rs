//! # Orchestration
//!
//! Drives the registered modules through boot and the main loop:
//!
//! - **Orchestrator**: owns the registry, persistence engine and watchdog
//!   tracker; only the main context touches the latter two
//! - **SaveTrigger**: power-fail save request, safe to raise from a signal
//!   handler
//! - **SecondaryExecutor**: optional second execution context for modules
//!   that opt in
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keel_core::scheduling::{Orchestrator, OrchestratorConfig, Platform};
//!
//! let platform = Platform::new(Box::new(bus), Box::new(region));
//! let mut orchestrator = Orchestrator::new(OrchestratorConfig::standard(), platform);
//! orchestrator.add(1, Box::new(logic))?;
//! orchestrator.add(2, Box::new(binary_input))?;
//! orchestrator.run()?; // init, setup, then loop until stopped
//! ```

pub mod config;
pub mod executors;
pub mod orchestrator;
pub mod trigger;

pub use config::OrchestratorConfig;
pub use executors::SecondaryExecutor;
pub use orchestrator::{Orchestrator, Platform};
pub use trigger::SaveTrigger;

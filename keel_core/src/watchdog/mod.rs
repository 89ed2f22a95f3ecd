//! # Watchdog safety tracker
//!
//! - **WatchdogTracker**: arms and feeds the hardware timer, records whether
//!   this boot followed a crash
//! - **RetainedStore**: counters that survive a reset but not a power loss
//! - **ResetCause / HardwareWatchdog**: per-target capabilities, chosen by
//!   the integrator at build time

pub mod platform;
pub mod retained;
pub mod tracker;

pub use platform::{FixedResetCause, HardwareWatchdog, ResetCause, SentinelResetCause, SoftwareWatchdog};
pub use retained::{RetainedMemory, RetainedStore, RUNNING_SENTINEL};
pub use tracker::{WatchdogState, WatchdogTracker, DEFAULT_MAX_PERIOD};

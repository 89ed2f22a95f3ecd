use super::platform::{HardwareWatchdog, ResetCause};
use super::retained::{RetainedStore, RUNNING_SENTINEL};
use crate::error::KeelResult;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const TARGET: &str = "keel::watchdog";

/// Default longest silent period before the hardware resets the device
pub const DEFAULT_MAX_PERIOD: Duration = Duration::from_millis(16_384);

/// Hardware timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Inactive,
    Active,
}

impl fmt::Display for WatchdogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchdogState::Inactive => write!(f, "Inactive"),
            WatchdogState::Active => write!(f, "Active"),
        }
    }
}

/// Liveness pulse plus cross-reset crash counting.
///
/// The reset cause is evaluated exactly once, at construction. The
/// restart counter lives in retained memory and saturates at 255.
pub struct WatchdogTracker {
    hardware: Box<dyn HardwareWatchdog>,
    store: Arc<dyn RetainedStore>,
    max_period: Duration,
    state: WatchdogState,
    last_reset_was_crash: bool,
}

impl WatchdogTracker {
    /// Boot-time construction.
    pub fn new(
        hardware: Box<dyn HardwareWatchdog>,
        store: Arc<dyn RetainedStore>,
        reset_cause: &dyn ResetCause,
        max_period: Duration,
    ) -> Self {
        let last_reset_was_crash = reset_cause.was_fault_or_watchdog_reset();

        if last_reset_was_crash {
            let count = store.restart_count().saturating_add(1);
            store.set_restart_count(count);
            log::warn!(target: TARGET, "restarted by watchdog or fault ({} in a row)", count);
        } else {
            store.set_restart_count(0);
        }

        // not running until armed in this boot
        store.set_running_state(0);

        Self {
            hardware,
            store,
            max_period,
            state: WatchdogState::Inactive,
            last_reset_was_crash,
        }
    }

    /// Arm the hardware timer
    pub fn activate(&mut self) -> KeelResult<()> {
        if cfg!(feature = "debugger") {
            log::info!(target: TARGET, "disabled while a debugger is attached");
            return Ok(());
        }

        log::info!(
            target: TARGET,
            "Start with a watchtime of {}ms",
            self.max_period.as_millis()
        );
        self.hardware.arm(self.max_period)?;
        self.store.set_running_state(RUNNING_SENTINEL);
        self.state = WatchdogState::Active;
        Ok(())
    }

    pub fn deactivate(&mut self) -> KeelResult<()> {
        self.state = WatchdogState::Inactive;
        self.store.set_running_state(0);
        self.hardware.disarm()
    }

    /// Feed the hardware timer. No-op while inactive.
    pub fn pulse(&mut self) {
        if self.state != WatchdogState::Active {
            return;
        }
        if let Err(e) = self.hardware.feed() {
            log::error!(target: TARGET, "feed failed: {}", e);
        }
    }

    /// Mark the coming reset as planned so the next boot does not count it
    pub fn safe_restart(&mut self) {
        self.store.set_running_state(0);
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == WatchdogState::Active
    }

    pub fn last_reset_was_crash(&self) -> bool {
        self.last_reset_was_crash
    }

    /// Consecutive watchdog/fault restarts, including this boot
    pub fn restart_count(&self) -> u8 {
        self.store.restart_count()
    }

    pub fn max_period(&self) -> Duration {
        self.max_period
    }
}

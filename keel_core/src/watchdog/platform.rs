// Per-target watchdog hardware and reset-cause variants

use super::retained::{RetainedStore, RUNNING_SENTINEL};
use crate::error::KeelResult;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hardware watchdog timer
pub trait HardwareWatchdog: Send {
    /// Start the countdown; the platform resets if not fed within `period`
    fn arm(&mut self, period: Duration) -> KeelResult<()>;

    fn disarm(&mut self) -> KeelResult<()>;

    /// Restart the countdown
    fn feed(&mut self) -> KeelResult<()>;
}

/// Answers "did the last reset come from the watchdog or a fault?"
pub trait ResetCause: Send {
    fn was_fault_or_watchdog_reset(&self) -> bool;
}

/// Reset cause for targets that report it directly (and for tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedResetCause(pub bool);

impl ResetCause for FixedResetCause {
    fn was_fault_or_watchdog_reset(&self) -> bool {
        self.0
    }
}

/// Reset cause for targets without a readable reset reason.
///
/// The tracker sets a sentinel in retained memory while the watchdog is
/// armed and clears it on a planned restart. Finding it still set at boot
/// means the previous run ended without a clean shutdown.
pub struct SentinelResetCause {
    store: Arc<dyn RetainedStore>,
}

impl SentinelResetCause {
    pub fn new(store: Arc<dyn RetainedStore>) -> Self {
        Self { store }
    }
}

impl ResetCause for SentinelResetCause {
    fn was_fault_or_watchdog_reset(&self) -> bool {
        self.store.running_state() == RUNNING_SENTINEL
    }
}

#[derive(Debug)]
struct SoftwareState {
    period: Option<Duration>,
    last_feed: Instant,
    feeds: u64,
}

/// Host watchdog: keeps the deadline, the caller decides what expiry means.
/// Clones share state.
#[derive(Debug, Clone)]
pub struct SoftwareWatchdog {
    state: Arc<Mutex<SoftwareState>>,
}

impl Default for SoftwareWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareWatchdog {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SoftwareState {
                period: None,
                last_feed: Instant::now(),
                feeds: 0,
            })),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().period.is_some()
    }

    /// Armed and not fed within the period
    pub fn is_expired(&self) -> bool {
        let state = self.state.lock();
        state
            .period
            .is_some_and(|period| state.last_feed.elapsed() > period)
    }

    pub fn feed_count(&self) -> u64 {
        self.state.lock().feeds
    }
}

impl HardwareWatchdog for SoftwareWatchdog {
    fn arm(&mut self, period: Duration) -> KeelResult<()> {
        let mut state = self.state.lock();
        state.period = Some(period);
        state.last_feed = Instant::now();
        Ok(())
    }

    fn disarm(&mut self) -> KeelResult<()> {
        self.state.lock().period = None;
        Ok(())
    }

    fn feed(&mut self) -> KeelResult<()> {
        let mut state = self.state.lock();
        state.last_feed = Instant::now();
        state.feeds += 1;
        Ok(())
    }
}

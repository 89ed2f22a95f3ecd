use crate::error::KeelResult;
use crate::persistence::StateWriter;
use std::fmt;
use std::time::Duration;

/// Lifecycle phase of a registered module as seen by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Registered,
    Restored,
    Running,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Registered => write!(f, "Registered"),
            ModuleState::Restored => write!(f, "Restored"),
            ModuleState::Running => write!(f, "Running"),
        }
    }
}

/// Loop timing metrics for one module
#[derive(Debug, Clone, Default)]
pub struct ModuleMetrics {
    pub loop_calls: u64,
    pub last_loop: Duration,
    pub max_loop: Duration,
    pub total_loop: Duration,
    pub overruns: u64,
}

impl ModuleMetrics {
    /// Record one loop call. Returns true if it exceeded `budget`.
    pub fn record(&mut self, elapsed: Duration, budget: Duration) -> bool {
        self.loop_calls += 1;
        self.last_loop = elapsed;
        self.total_loop += elapsed;
        if elapsed > self.max_loop {
            self.max_loop = elapsed;
        }

        let overrun = elapsed > budget;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    pub fn avg_loop(&self) -> Duration {
        if self.loop_calls == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_loop.as_nanos() / self.loop_calls as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// A functional unit of the firmware.
///
/// Modules are constructed by the integrator, handed to the orchestrator
/// once, and then driven through this trait for the rest of the process
/// lifetime. Every hook except [`Module::name`] and [`Module::tick`] has a
/// no-op default.
///
/// Persistent state is an opaque blob: the module declares how many bytes
/// it wants stored via [`Module::state_size`], writes them in
/// [`Module::persist_state`] and gets them back in [`Module::restore_state`].
pub trait Module: Send {
    /// Diagnostic name
    fn name(&self) -> &str;

    /// Bytes this module wants persisted right now. Zero means nothing to
    /// store. Queried fresh before every save and after every load.
    fn state_size(&self) -> u16 {
        0
    }

    /// Rebuild state from a stored record.
    ///
    /// An empty slice means no record was found for this module and it
    /// should fall back to defaults. The slice must not be retained.
    fn restore_state(&mut self, _data: &[u8]) {}

    /// Write the payload through `writer`, which is bounded to exactly
    /// `state_size()` bytes. Unwritten bytes are padded by the engine.
    fn persist_state(&self, _writer: &mut StateWriter<'_>) -> KeelResult<()> {
        Ok(())
    }

    /// Called once after the persisted state has been loaded
    fn setup(&mut self) {}

    /// Main loop body, called once per pass on the main context
    fn tick(&mut self);

    /// Opt into the secondary execution context. When the orchestrator runs
    /// with two contexts, such modules get [`Module::tick_secondary`] there
    /// instead of [`Module::tick`] on the main context.
    fn uses_secondary_context(&self) -> bool {
        false
    }

    /// Loop body for the secondary context
    fn tick_secondary(&mut self) {}

    /// Fired once when the configured startup delay has elapsed
    fn on_startup_delay_elapsed(&mut self) {}

    /// Fired when the external save signal is processed, right before the
    /// forced save
    fn before_save_signal(&mut self) {}

    /// Fired before a planned restart
    fn before_restart(&mut self) {}
}

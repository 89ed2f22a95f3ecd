use super::config::OrchestratorConfig;
use super::executors::SecondaryExecutor;
use super::trigger::SaveTrigger;
use crate::core::{ExecutionContext, Module, ModuleMetrics, ModuleRegistry, ModuleState, RegisteredModule};
use crate::error::{KeelError, KeelResult};
use crate::hal::{BusInterface, MemoryProbe, NoMemoryProbe};
use crate::persistence::{LoadOutcome, PersistenceEngine, PersistentRegion, SaveOutcome};
use crate::watchdog::{
    FixedResetCause, HardwareWatchdog, ResetCause, RetainedMemory, RetainedStore, SoftwareWatchdog,
    WatchdogTracker,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TARGET: &str = "keel::orchestrator";

/// Collaborators the orchestrator is built from
pub struct Platform {
    pub bus: Box<dyn BusInterface>,
    pub region: Box<dyn PersistentRegion>,
    pub watchdog: Box<dyn HardwareWatchdog>,
    pub retained: Arc<dyn RetainedStore>,
    pub reset_cause: Box<dyn ResetCause>,
    pub memory: Box<dyn MemoryProbe>,
}

impl Platform {
    /// Bus and region are mandatory; the rest defaults to host stand-ins
    /// (software watchdog, in-process retained memory, clean reset cause)
    pub fn new(bus: Box<dyn BusInterface>, region: Box<dyn PersistentRegion>) -> Self {
        Self {
            bus,
            region,
            watchdog: Box::new(SoftwareWatchdog::new()),
            retained: Arc::new(RetainedMemory::new()),
            reset_cause: Box::new(FixedResetCause(false)),
            memory: Box::new(NoMemoryProbe),
        }
    }

    pub fn with_watchdog(mut self, watchdog: Box<dyn HardwareWatchdog>) -> Self {
        self.watchdog = watchdog;
        self
    }

    pub fn with_retained(mut self, retained: Arc<dyn RetainedStore>, reset_cause: Box<dyn ResetCause>) -> Self {
        self.retained = retained;
        self.reset_cause = reset_cause;
        self
    }

    pub fn with_memory_probe(mut self, memory: Box<dyn MemoryProbe>) -> Self {
        self.memory = memory;
        self
    }
}

/// Owns the registry, watchdog tracker and persistence engine and drives
/// every module through boot, setup and the main loop.
///
/// # Example
/// ```ignore
/// let mut orchestrator = Orchestrator::new(OrchestratorConfig::standard(), platform);
/// orchestrator.add(1, Box::new(LogicModule::new()))?;
/// orchestrator.init()?;
/// orchestrator.setup();
/// loop {
///     orchestrator.loop_once()?;
/// }
/// ```
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: ModuleRegistry,
    flash: PersistenceEngine,
    watchdog: WatchdogTracker,
    bus: Box<dyn BusInterface>,
    memory: Box<dyn MemoryProbe>,
    secondary: Option<SecondaryExecutor>,
    save_trigger: SaveTrigger,
    running: Arc<AtomicBool>,
    boot_time: Instant,
    pass_start: Option<Instant>,
    passes: u64,
    free_memory_min: Option<usize>,
    after_startup_delay: bool,
    initialized: bool,
    setup_done: bool,
    load_outcome: Option<LoadOutcome>,
}

impl Orchestrator {
    /// Boot-time construction. Evaluates the reset cause immediately.
    pub fn new(config: OrchestratorConfig, platform: Platform) -> Self {
        let watchdog = WatchdogTracker::new(
            platform.watchdog,
            platform.retained,
            platform.reset_cause.as_ref(),
            config.watchdog_max_period(),
        );

        let secondary = if config.dual_context {
            SecondaryExecutor::new(config.secondary_core)
        } else {
            None
        };

        Self {
            registry: ModuleRegistry::with_capacity(config.max_modules),
            flash: PersistenceEngine::new(platform.region, config.flash_config()),
            watchdog,
            bus: platform.bus,
            memory: platform.memory,
            secondary,
            save_trigger: SaveTrigger::new(),
            running: Arc::new(AtomicBool::new(true)),
            boot_time: Instant::now(),
            pass_start: None,
            passes: 0,
            free_memory_min: None,
            after_startup_delay: false,
            initialized: false,
            setup_done: false,
            load_outcome: None,
            config,
        }
    }

    /// Register a module. Errors are configuration errors and must abort
    /// startup.
    pub fn add(&mut self, id: u8, module: Box<dyn Module>) -> KeelResult<&mut Self> {
        if self.initialized {
            return Err(KeelError::config(format!(
                "cannot register '{}' after init",
                module.name()
            )));
        }
        self.registry.register(id, module)?;
        Ok(self)
    }

    /// Load persisted state once and arm the watchdog
    pub fn init(&mut self) -> KeelResult<LoadOutcome> {
        if self.initialized {
            return Err(KeelError::Internal("orchestrator already initialized".to_string()));
        }
        self.config.validate()?;

        log::info!(
            target: TARGET,
            "init with {} modules (last reset crash: {}, restarts: {})",
            self.registry.len(),
            self.watchdog.last_reset_was_crash(),
            self.watchdog.restart_count()
        );

        let identity = self.bus.device_identity();
        let outcome = self.flash.load(&mut self.registry, identity)?;

        if self.config.watchdog_enabled {
            self.watchdog.activate()?;
        }

        self.initialized = true;
        self.load_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Dispatch `setup()` in registration order
    pub fn setup(&mut self) {
        for entry in self.registry.iter_mut() {
            log::debug!(target: TARGET, "setup {} ({})", entry.name(), entry.id());
            entry.module_mut().setup();
            entry.set_state(ModuleState::Running);
        }
        self.setup_done = true;
    }

    /// One pass of the main loop
    pub fn loop_once(&mut self) -> KeelResult<()> {
        self.pass_start = Some(Instant::now());
        self.collect_memory_stats();

        if self.save_trigger.take() {
            self.process_save_signal();
        }

        self.process_startup_delay();
        self.dispatch();
        self.watchdog.pulse();

        self.passes += 1;
        Ok(())
    }

    fn dispatch(&mut self) {
        let budget = self.config.max_loop_time();

        match &self.secondary {
            Some(executor) => {
                let (mut secondary, mut main): (Vec<&mut RegisteredModule>, Vec<&mut RegisteredModule>) = self
                    .registry
                    .iter_mut()
                    .partition(|entry| entry.module().uses_secondary_context());

                executor.execute(&mut secondary, budget, || {
                    for entry in main.iter_mut() {
                        entry.run_tick(ExecutionContext::Main, budget);
                    }
                });
            }
            None => {
                for entry in self.registry.iter_mut() {
                    entry.run_tick(ExecutionContext::Main, budget);
                }
            }
        }
    }

    /// A failed save is logged; the pass carries on so the watchdog still
    /// gets its pulse
    fn process_save_signal(&mut self) {
        log::info!(target: TARGET, "save signal received");
        for entry in self.registry.iter_mut() {
            entry.module_mut().before_save_signal();
        }
        if let Err(e) = self.save(true) {
            log::error!(target: TARGET, "save on signal failed: {}", e);
        }
    }

    fn process_startup_delay(&mut self) {
        if self.after_startup_delay || self.boot_time.elapsed() < self.config.startup_delay() {
            return;
        }

        self.after_startup_delay = true;
        log::debug!(target: TARGET, "startup delay elapsed");
        for entry in self.registry.iter_mut() {
            entry.module_mut().on_startup_delay_elapsed();
        }
    }

    fn collect_memory_stats(&mut self) {
        if let Some(free) = self.memory.free_memory() {
            self.free_memory_min = Some(self.free_memory_min.map_or(free, |min| min.min(free)));
        }
    }

    /// Persist all module state. Main context only.
    pub fn save(&mut self, force: bool) -> KeelResult<SaveOutcome> {
        self.flash.save(&self.registry, self.bus.as_ref(), force)
    }

    /// Notify modules, force a save and mark the coming reset as planned
    pub fn prepare_restart(&mut self) -> KeelResult<()> {
        log::info!(target: TARGET, "prepare restart");
        for entry in self.registry.iter_mut() {
            entry.module_mut().before_restart();
        }
        self.save(true)?;
        self.watchdog.safe_restart();
        Ok(())
    }

    /// Handle for raising the save signal from interrupt context
    pub fn save_trigger(&self) -> SaveTrigger {
        self.save_trigger.clone()
    }

    /// Run passes until stopped or `duration` has elapsed
    pub fn run_for(&mut self, duration: Duration) -> KeelResult<()> {
        self.run_until(Some(duration))
    }

    /// Run passes until stopped. Ctrl+C is treated as a power-fail signal:
    /// state is saved before returning.
    pub fn run(&mut self) -> KeelResult<()> {
        let trigger = self.save_trigger.clone();
        let running = self.running.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            trigger.trigger();
            running.store(false, Ordering::SeqCst);
        }) {
            log::warn!(target: TARGET, "failed to set signal handler: {}", e);
        }

        self.run_until(None)
    }

    fn run_until(&mut self, duration: Option<Duration>) -> KeelResult<()> {
        if !self.initialized {
            self.init()?;
        }
        if !self.setup_done {
            self.setup();
        }

        let start = Instant::now();
        while self.is_running() {
            if duration.is_some_and(|max| start.elapsed() >= max) {
                break;
            }
            self.loop_once()?;
            std::thread::yield_now();
        }

        // a signal raised while stopping still gets its save
        if self.save_trigger.take() {
            self.process_save_signal();
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True while the current pass has used less than half of the loop
    /// budget
    pub fn has_free_loop_time(&self) -> bool {
        self.pass_start
            .map_or(true, |start| start.elapsed() < self.config.max_loop_time() / 2)
    }

    pub fn after_startup_delay(&self) -> bool {
        self.after_startup_delay
    }

    pub fn free_memory_min(&self) -> Option<usize> {
        self.free_memory_min
    }

    pub fn uses_dual_context(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn uptime(&self) -> Duration {
        self.boot_time.elapsed()
    }

    pub fn metrics(&self, id: u8) -> Option<&ModuleMetrics> {
        self.registry.entry(id).map(|entry| entry.metrics())
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn watchdog(&self) -> &WatchdogTracker {
        &self.watchdog
    }

    pub fn flash(&self) -> &PersistenceEngine {
        &self.flash
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Result of the boot-time load
    pub fn load_outcome(&self) -> Option<&LoadOutcome> {
        self.load_outcome.as_ref()
    }
}

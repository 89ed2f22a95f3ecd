use super::module::{Module, ModuleMetrics, ModuleState};
use crate::error::{KeelError, KeelResult};
use std::time::{Duration, Instant};

/// Default registry capacity
pub const MAX_MODULES: usize = 9;

/// Id 0 never names a module
pub const RESERVED_MODULE_ID: u8 = 0;

/// Which execution context a loop call ran on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Main,
    Secondary,
}

/// A module together with its id and loop bookkeeping
pub struct RegisteredModule {
    id: u8,
    module: Box<dyn Module>,
    state: ModuleState,
    metrics: ModuleMetrics,
}

impl RegisteredModule {
    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    pub fn module_mut(&mut self) -> &mut dyn Module {
        self.module.as_mut()
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ModuleState) {
        self.state = state;
    }

    pub fn metrics(&self) -> &ModuleMetrics {
        &self.metrics
    }

    /// Run one loop call on `context`, timing it against `budget`.
    /// Overruns are reported, never fatal.
    pub(crate) fn run_tick(&mut self, context: ExecutionContext, budget: Duration) -> Duration {
        let start = Instant::now();
        match context {
            ExecutionContext::Main => self.module.tick(),
            ExecutionContext::Secondary => self.module.tick_secondary(),
        }
        let elapsed = start.elapsed();

        if self.metrics.record(elapsed, budget) {
            log::warn!(
                target: "keel::orchestrator",
                "module {} ({}) loop took {}us on {:?} context (budget {}us)",
                self.module.name(),
                self.id,
                elapsed.as_micros(),
                context,
                budget.as_micros()
            );
        }
        elapsed
    }
}

/// Fixed-capacity, insertion-ordered mapping from module id to module.
///
/// Registration order is dispatch order for setup and loop, and the order
/// records are written to the persistent region.
pub struct ModuleRegistry {
    entries: Vec<RegisteredModule>,
    capacity: usize,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::with_capacity(MAX_MODULES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Register `module` under `id`.
    ///
    /// Fails without touching the registry if the id is reserved, already
    /// taken, or the capacity is exhausted.
    pub fn register(&mut self, id: u8, module: Box<dyn Module>) -> KeelResult<()> {
        if id == RESERVED_MODULE_ID {
            return Err(KeelError::config(format!(
                "module '{}' uses reserved id {}",
                module.name(),
                RESERVED_MODULE_ID
            )));
        }
        if let Some(existing) = self.lookup(id) {
            return Err(KeelError::config(format!(
                "module id {} already registered by '{}'",
                id,
                existing.name()
            )));
        }
        if self.entries.len() >= self.capacity {
            return Err(KeelError::config(format!(
                "cannot register '{}': registry full ({} modules)",
                module.name(),
                self.capacity
            )));
        }

        log::debug!(target: "keel::orchestrator", "register module {} ({})", module.name(), id);
        self.entries.push(RegisteredModule {
            id,
            module,
            state: ModuleState::Registered,
            metrics: ModuleMetrics::default(),
        });
        Ok(())
    }

    pub fn lookup(&self, id: u8) -> Option<&dyn Module> {
        self.entry(id).map(|entry| entry.module())
    }

    pub fn lookup_mut(&mut self, id: u8) -> Option<&mut dyn Module> {
        self.entry_mut(id).map(|entry| entry.module_mut())
    }

    pub fn entry(&self, id: u8) -> Option<&RegisteredModule> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entry_mut(&mut self, id: u8) -> Option<&mut RegisteredModule> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// All modules in registration order
    pub fn iter(&self) -> std::slice::Iter<'_, RegisteredModule> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, RegisteredModule> {
        self.entries.iter_mut()
    }

    pub fn ids(&self) -> Vec<u8> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

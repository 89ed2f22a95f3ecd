//! # Module contract and registry
//!
//! - **Module**: the trait every functional unit implements
//! - **ModuleRegistry**: ordered id -> module mapping that drives dispatch
//!   and save order
//!
//! ## Module Lifecycle
//!
//! 1. **Construction** - built by the integrator with constructed defaults
//! 2. **Registration** - handed to the orchestrator under a unique id
//! 3. **Restore** - `restore_state()` with the stored record or an empty slice
//! 4. **Setup** - `setup()` once
//! 5. **Execution** - `tick()` (or `tick_secondary()`) every pass

pub mod module;
pub mod registry;

pub use module::{Module, ModuleMetrics, ModuleState};
pub use registry::{ExecutionContext, ModuleRegistry, RegisteredModule, MAX_MODULES, RESERVED_MODULE_ID};

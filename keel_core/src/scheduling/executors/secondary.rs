use crate::core::{ExecutionContext, RegisteredModule};
use std::thread;
use std::time::Duration;

/// Second execution context running alongside the main pass.
///
/// Each pass the registry is split into two disjoint sets; the secondary
/// set runs on its own thread while the caller runs the main set. The
/// secondary side only ever sees modules, never the persistence engine.
#[derive(Debug)]
pub struct SecondaryExecutor {
    core: Option<usize>,
}

impl SecondaryExecutor {
    /// None when the platform has a single core
    pub fn new(core: Option<usize>) -> Option<Self> {
        if num_cpus::get() < 2 {
            log::info!(target: "keel::orchestrator", "single core, secondary context disabled");
            return None;
        }
        Some(Self { core })
    }

    pub fn core(&self) -> Option<usize> {
        self.core
    }

    /// Run one pass of `secondary` on the second context while `main_pass`
    /// runs on the calling thread. Returns when both are done.
    pub fn execute<F>(&self, secondary: &mut [&mut RegisteredModule], budget: Duration, main_pass: F)
    where
        F: FnOnce(),
    {
        if secondary.is_empty() {
            main_pass();
            return;
        }

        let core = self.core;
        thread::scope(|s| {
            let handle = s.spawn(move || {
                if let Some(id) = core {
                    if !core_affinity::set_for_current(core_affinity::CoreId { id }) {
                        log::debug!(target: "keel::orchestrator", "could not pin secondary context to core {}", id);
                    }
                }
                for entry in secondary.iter_mut() {
                    entry.run_tick(ExecutionContext::Secondary, budget);
                }
            });

            main_pass();

            if let Err(panic) = handle.join() {
                log::error!(target: "keel::orchestrator", "secondary context panicked");
                std::panic::resume_unwind(panic);
            }
        });
    }
}

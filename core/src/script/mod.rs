//! Script Sandbox Engine
//!
//! Runs a map generation script (a WebAssembly module) inside a `wasmtime` store with a stack
//! ceiling, a memory ceiling and a polled wall-clock deadline. The script builds the whole map
//! through a small native API (see [`host`]) and commits it with one `set_map_data` call.
//!
//! A run moves through [`ScriptPhase`]:
//!
//! ```text
//! Created -> Compiled -> Bound -> Running -> Completed | Faulted | TimedOut
//! ```
//!
//! Every failure is a [`ScriptError`]; nothing the guest does can take the host down.

mod engine;
pub mod host;
mod limits;
mod memory;
pub mod noise;

#[cfg(test)]
mod tests;

pub use crate::error::ScriptError;
pub use host::{NO_PLAYER, OBJECT_DESCRIPTOR_LEN, RIGGED_REGION_LEN, ScriptOutput};
pub use limits::{
    DEFAULT_EPOCH_TICK_MILLIS, DEFAULT_MAX_MEMORY_BYTES, DEFAULT_MAX_STACK_BYTES, DeadlineCheck,
    InterruptCheck, ScriptLimits,
};

use rand::SeedableRng;
use rand_pcg::Pcg32;
use tracing::debug;
use wasmtime::{Linker, Store, Trap, UpdateDeadline};

use crate::logging::SharedLogger;
use engine::ScriptEngine;
use host::HostState;
use limits::EpochTicker;

/// Name of the optional export called after the start function.
pub const ENTRY_POINT: &str = "generate";

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptPhase {
    Created,
    Compiled,
    /// Natives and limits installed.
    Bound,
    Running,
    Completed,
    Faulted,
    TimedOut,
}

/// Single-use runner for one map script.
pub struct MapScriptRunner {
    seed: u32,
    preview: bool,
    limits: ScriptLimits,
    logger: SharedLogger,
    interrupt: Option<Box<dyn InterruptCheck>>,
    phase: ScriptPhase,
}

impl MapScriptRunner {
    pub fn new(seed: u32, preview: bool, limits: ScriptLimits, logger: SharedLogger) -> Self {
        Self {
            seed,
            preview,
            limits,
            logger,
            interrupt: None,
            phase: ScriptPhase::Created,
        }
    }

    /// Replace the default wall-clock deadline with a custom check.
    pub fn with_interrupt(self, check: impl InterruptCheck + 'static) -> Self {
        self.with_boxed_interrupt(Box::new(check))
    }

    pub fn with_boxed_interrupt(mut self, check: Box<dyn InterruptCheck>) -> Self {
        self.interrupt = Some(check);
        self
    }

    pub fn phase(&self) -> ScriptPhase {
        self.phase
    }

    fn enter(&mut self, phase: ScriptPhase) {
        debug!(from = ?self.phase, to = ?phase, "map script phase");
        self.phase = phase;
    }

    /// Compile and run `source`, returning the committed map.
    ///
    /// `path` names the script in log lines. A runner can only be run once.
    pub fn run(&mut self, source: &[u8], path: &str) -> Result<ScriptOutput, ScriptError> {
        if self.phase != ScriptPhase::Created {
            return Err(ScriptError::AlreadyRun);
        }
        let result = self.execute(source, path);
        match &result {
            Ok(_) | Err(ScriptError::NoMapData) => self.enter(ScriptPhase::Completed),
            Err(ScriptError::TimedOut(_)) => self.enter(ScriptPhase::TimedOut),
            Err(_) => self.enter(ScriptPhase::Faulted),
        }
        result
    }

    fn execute(&mut self, source: &[u8], path: &str) -> Result<ScriptOutput, ScriptError> {
        let engine =
            ScriptEngine::new(&self.limits).map_err(|e| ScriptError::Engine(format!("{:#}", e)))?;
        let module = engine
            .load_module(source)
            .map_err(|e| ScriptError::Compile(format!("{:#}", e)))?;
        ScriptEngine::validate_module_memory(&module, self.limits.max_memory_bytes)
            .map_err(|_| ScriptError::MemoryLimit(self.limits.max_memory_bytes))?;
        self.enter(ScriptPhase::Compiled);

        let interrupt = self
            .interrupt
            .take()
            .unwrap_or_else(|| Box::new(DeadlineCheck::new(self.limits.max_runtime)));
        let script_name = path.rsplit(['/', '\\']).next().unwrap_or(path).to_string();
        let state = HostState::new(
            Pcg32::seed_from_u64(u64::from(self.seed)),
            self.logger.clone(),
            script_name,
            interrupt,
            self.limits.max_memory_bytes,
        );

        let mut store = Store::new(engine.engine(), state);
        store.limiter(|state| state);
        // Deadline 0 makes the first epoch check poll immediately.
        store.set_epoch_deadline(0);
        store.epoch_deadline_callback(|mut cx| {
            let state = cx.data_mut();
            if state.interrupt.should_interrupt() {
                state.timed_out = true;
                anyhow::bail!("map script interrupted");
            }
            Ok(UpdateDeadline::Continue(1))
        });

        let mut linker = Linker::new(engine.engine());
        host::register_natives(&mut linker, &mut store, self.preview)
            .map_err(|e| ScriptError::Instantiate(format!("{:#}", e)))?;
        self.enter(ScriptPhase::Bound);

        let max_runtime_secs = self.limits.max_runtime.as_secs();
        let _ticker = EpochTicker::start(engine.engine(), self.limits.epoch_tick);
        self.enter(ScriptPhase::Running);

        // The start function runs inside instantiate.
        let instance = match linker.instantiate(&mut store, &module) {
            Ok(instance) => instance,
            Err(e) => return Err(failure(store.data_mut(), e, max_runtime_secs)),
        };
        if let Ok(generate) = instance.get_typed_func::<(), ()>(&mut store, ENTRY_POINT)
            && let Err(e) = generate.call(&mut store, ())
        {
            return Err(failure(store.data_mut(), e, max_runtime_secs));
        }

        store.data_mut().output.take().ok_or(ScriptError::NoMapData)
    }
}

/// Most specific cause of a failed instantiate or call.
fn failure(state: &mut HostState, error: anyhow::Error, max_runtime_secs: u64) -> ScriptError {
    if state.timed_out {
        return ScriptError::TimedOut(max_runtime_secs);
    }
    if state.memory_exceeded {
        return ScriptError::MemoryLimit(state.max_memory_bytes);
    }
    if let Some(fault) = state.fault.take() {
        return fault;
    }
    if error.downcast_ref::<Trap>().is_some() {
        return ScriptError::Trap(format!("{:#}", error));
    }
    ScriptError::Instantiate(format!("{:#}", error))
}

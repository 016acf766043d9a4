//! Execution limits for map scripts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use mapforge_shared::MAX_MAPSCRIPT_RUNTIME_SECS;
use wasmtime::Engine;

/// Default guest call-stack ceiling (512 KiB).
pub const DEFAULT_MAX_STACK_BYTES: usize = 512 * 1024;

/// Default guest linear memory ceiling (100 MiB).
pub const DEFAULT_MAX_MEMORY_BYTES: usize = 100 * 1024 * 1024;

/// Default interval between epoch ticks.
pub const DEFAULT_EPOCH_TICK_MILLIS: u64 = 10;

/// Stack, memory and wall-clock bounds applied to one script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    pub max_stack_bytes: usize,
    pub max_memory_bytes: usize,
    pub max_runtime: Duration,
    /// How often the interrupt check is polled.
    pub epoch_tick: Duration,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_stack_bytes: DEFAULT_MAX_STACK_BYTES,
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            max_runtime: Duration::from_secs(MAX_MAPSCRIPT_RUNTIME_SECS),
            epoch_tick: Duration::from_millis(DEFAULT_EPOCH_TICK_MILLIS),
        }
    }
}

impl ScriptLimits {
    /// Runtime is clamped to the 30 second ceiling; a zero tick becomes 1 ms.
    pub fn new(
        max_stack_bytes: usize,
        max_memory_bytes: usize,
        max_runtime: Duration,
        epoch_tick: Duration,
    ) -> Self {
        Self {
            max_stack_bytes,
            max_memory_bytes,
            max_runtime: max_runtime.min(Duration::from_secs(MAX_MAPSCRIPT_RUNTIME_SECS)),
            epoch_tick: epoch_tick.max(Duration::from_millis(1)),
        }
    }
}

/// Polled while a script runs. Returning true aborts the script as timed out.
pub trait InterruptCheck: Send {
    fn should_interrupt(&mut self) -> bool;
}

impl<F> InterruptCheck for F
where
    F: FnMut() -> bool + Send,
{
    fn should_interrupt(&mut self) -> bool {
        self()
    }
}

/// Wall-clock deadline measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineCheck {
    started: Instant,
    max_runtime: Duration,
}

impl DeadlineCheck {
    pub fn new(max_runtime: Duration) -> Self {
        Self {
            started: Instant::now(),
            max_runtime,
        }
    }
}

impl InterruptCheck for DeadlineCheck {
    fn should_interrupt(&mut self) -> bool {
        self.started.elapsed() >= self.max_runtime
    }
}

/// Background thread advancing the engine epoch so running guests reach their deadline callback.
///
/// Stops and joins when dropped.
pub(crate) struct EpochTicker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EpochTicker {
    pub(crate) fn start(engine: &Engine, tick: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let engine = engine.clone();
        let flag = stop.clone();
        let handle = std::thread::Builder::new()
            .name("mapforge-epoch".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    std::thread::sleep(tick);
                    engine.increment_epoch();
                }
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Without a ticker the deadline callback only runs at the first epoch check.
                tracing::warn!("failed to spawn epoch ticker: {}", e);
                None
            }
        };

        Self { stop, handle }
    }
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("epoch ticker panicked");
        }
    }
}

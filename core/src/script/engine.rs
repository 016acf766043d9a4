//! WASM engine wrapper for compiling map scripts

use anyhow::{Context, Result};
use wasmtime::{Config, Engine, ExternType, Module};

use super::limits::ScriptLimits;

const WASM_PAGE_BYTES: u64 = 64 * 1024;

/// Engine configured for sandboxed map scripts (one per run)
pub(crate) struct ScriptEngine {
    engine: Engine,
}

impl ScriptEngine {
    /// Create an engine with epoch interruption and the stack ceiling from `limits`
    pub(crate) fn new(limits: &ScriptLimits) -> Result<Self> {
        let mut config = Config::new();
        config.epoch_interruption(true);
        config.max_wasm_stack(limits.max_stack_bytes);
        // Map content must not depend on the host's float behaviour.
        config.cranelift_nan_canonicalization(true);
        let engine = Engine::new(&config).context("Failed to create script engine")?;
        Ok(Self { engine })
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Compile a module from binary or text format
    pub(crate) fn load_module(&self, bytes: &[u8]) -> Result<Module> {
        Module::new(&self.engine, bytes).context("Failed to compile map script")
    }

    /// Reject modules whose declared minimum memory already exceeds the ceiling
    pub(crate) fn validate_module_memory(module: &Module, max_memory_bytes: usize) -> Result<()> {
        for export in module.exports() {
            if let ExternType::Memory(mem_type) = export.ty() {
                let min_bytes = mem_type.minimum().saturating_mul(WASM_PAGE_BYTES);
                if min_bytes > max_memory_bytes as u64 {
                    anyhow::bail!(
                        "memory '{}' requires {} bytes minimum, limit is {} bytes",
                        export.name(),
                        min_bytes,
                        max_memory_bytes
                    );
                }
            }
        }
        Ok(())
    }
}

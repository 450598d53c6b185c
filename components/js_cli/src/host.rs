//! Embedding host: a runtime with the standard library installed
//!
//! [`Host`] owns one [`Runtime`]; [`run_file`] is the whole life of a
//! CLI invocation: decode the module, run it, report.

use std::fs;
use std::path::Path;

use builtins::{ConsoleWriter, StdoutWriter};
use bytecode_system::{disassemble, BytecodeModule};
use core_types::Value;
use interpreter::{Runtime, RuntimeConfig};
use memory_manager::GcStats;
use tracing::{debug, info};

use crate::error::{CliError, CliResult};

/// Runtime plus realm, ready to run modules.
pub struct Host {
    runtime: Runtime,
}

impl Host {
    /// Create a runtime and install the built-ins, printing through `console`.
    pub fn new(config: RuntimeConfig, console: Box<dyn ConsoleWriter>) -> CliResult<Self> {
        let mut runtime = Runtime::new(config)?;
        let installed = builtins::install(&mut runtime, console);
        runtime.report(installed)?;
        debug!(target: "engine::cli", "host ready");
        Ok(Self { runtime })
    }

    /// A host whose console prints to stdout/stderr.
    pub fn with_stdout(config: RuntimeConfig) -> CliResult<Self> {
        Self::new(config, Box::new(StdoutWriter))
    }

    /// The underlying runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Mutable access for hosts that define their own globals.
    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Load and run `module`, returning the entry function's result.
    pub fn run_module(&mut self, module: BytecodeModule) -> CliResult<Value> {
        let url = module.source_url.clone();
        let id = self.runtime.load_module(module)?;
        let value = self.runtime.run_module(id)?;
        info!(target: "engine::cli", url = %url, "module finished");
        Ok(value)
    }

    /// Collector totals so far.
    pub fn gc_stats(&self) -> GcStats {
        self.runtime.heap_stats()
    }

    /// Write a pretty-printed JSON heap snapshot to `path`.
    pub fn write_heap_snapshot(&self, path: &Path) -> CliResult<()> {
        let json = self.runtime.heap_snapshot().to_json()?;
        fs::write(path, json).map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(target: "engine::cli", path = %path.display(), "heap snapshot written");
        Ok(())
    }
}

/// Read and decode a JSON bytecode module.
pub fn load_module_file(path: &Path) -> CliResult<BytecodeModule> {
    let name = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: name.clone(),
        source,
    })?;
    BytecodeModule::from_json(&text).map_err(|source| CliError::Module { path: name, source })
}

/// Run the module at `path` on `host`.
///
/// With `dump_bytecode` the disassembly is printed to stdout first.
pub fn run_file(host: &mut Host, path: &Path, dump_bytecode: bool) -> CliResult<Value> {
    let module = load_module_file(path)?;
    if dump_bytecode {
        print!("{}", disassemble(&module));
    }
    host.run_module(module)
}

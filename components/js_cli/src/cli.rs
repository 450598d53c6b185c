//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use interpreter::RuntimeConfig;
use memory_manager::HeapConfig;

/// Run a JSON bytecode module on the Corten interpreter.
#[derive(Debug, Clone, Parser)]
#[command(name = "corten-js", version, about)]
pub struct Cli {
    /// Bytecode module (JSON) to execute
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Maximum interpreted call depth before a RangeError
    #[arg(long, value_name = "FRAMES")]
    pub max_stack: Option<usize>,

    /// Young generation capacity in KiB
    #[arg(long, value_name = "KB")]
    pub young_gen_kb: Option<usize>,

    /// Hard heap limit in MiB
    #[arg(long, value_name = "MB")]
    pub max_heap_mb: Option<usize>,

    /// Print collector statistics to stderr on exit
    #[arg(long)]
    pub gc_stats: bool,

    /// Write a JSON heap snapshot to PATH after the run
    #[arg(long, value_name = "PATH")]
    pub heap_snapshot: Option<PathBuf>,

    /// Print the disassembled module before running it
    #[arg(long)]
    pub dump_bytecode: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Heap settings implied by the flags.
    pub fn heap_config(&self) -> HeapConfig {
        let mut heap = HeapConfig::default();
        if let Some(kb) = self.young_gen_kb {
            heap = heap.with_young_capacity(kb.saturating_mul(1024));
        }
        if let Some(mb) = self.max_heap_mb {
            heap = heap.with_max_heap(mb.saturating_mul(1024 * 1024));
        }
        heap
    }

    /// Runtime settings implied by the flags.
    pub fn runtime_config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::default().with_heap(self.heap_config());
        if let Some(frames) = self.max_stack {
            config = config.with_max_frames(frames);
        }
        config
    }

    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

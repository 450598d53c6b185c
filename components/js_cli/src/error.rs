//! Error types for the CLI

use bytecode_system::ModuleError;
use interpreter::EngineError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading the module or writing an output file failed
    #[error("{path}: {source}")]
    Io {
        /// File the operation touched
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The module file is not a valid bytecode module
    #[error("{path}: {source}")]
    Module {
        /// Module file
        path: String,
        /// Decoding failure
        #[source]
        source: ModuleError,
    },

    /// The engine reported an uncaught exception or a fatal fault
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Heap snapshot could not be serialized
    #[error("heap snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// No module file was given
    #[error("no module file given (use --file <FILE>)")]
    MissingFile,
}

impl CliError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::MissingFile => 2,
            _ => 1,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

//! JavaScript Runtime CLI Library
//!
//! Argument parsing, the embedding [`Host`] and the error type used by the
//! `corten-js` binary. Scripts arrive as JSON bytecode modules produced by
//! an external compiler.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod host;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use host::{load_module_file, run_file, Host};

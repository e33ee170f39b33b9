//! Infrastructure layer for taskflow.
//!
//! Contains the concrete `TaskExecutor` implementations behind the builtin
//! task types (`echo`, `sleep`, `shell`, `http`) and the loader for the
//! engine-wide `taskflow.toml`.

pub mod config;
pub mod executors;

pub use executors::builtin_dispatcher;

//! Workflow engine core: graph construction, scheduling, and run coordination.
//!
//! - `graph` -- task graph, cycle detection, levels, critical path
//! - `retry` -- retry decisions, backoff, injectable sleeper
//! - `executor` -- ready-set driven bounded-concurrency executor
//! - `definition` -- YAML/TOML/JSON parsing, validation, discovery
//! - `coordinator` -- owns a single workflow run and its read-only views

pub mod coordinator;
pub mod definition;
pub mod executor;
pub mod graph;
pub mod retry;

pub use coordinator::{WorkflowCoordinator, build_graph};
pub use definition::{WorkflowError, WorkflowFormat};
pub use executor::{ExecutionReport, ExecutorConfig, ExecutorError, GraphExecutor};
pub use graph::{GraphError, TaskGraph};
pub use retry::{RecordingSleeper, RetryDecision, RetryHandler, Sleeper, TokioSleeper};

//! Task executors: the capability interface the engine calls to run a task.
//!
//! - `executor` -- `TaskExecutor` trait (native async fn) and closure adapter
//! - `box_executor` -- object-safe wrapper for dynamic dispatch
//! - `dispatcher` -- `task_type` -> executor registry
//! - `timeout` -- wrapper that enforces a task's declared timeout

pub mod box_executor;
pub mod dispatcher;
pub mod executor;
pub mod timeout;

pub use box_executor::{BoxTaskExecutor, TaskExecutorDyn};
pub use dispatcher::TaskDispatcher;
pub use executor::{FnExecutor, TaskExecutor, TaskOutput};
pub use timeout::TimeoutExecutor;

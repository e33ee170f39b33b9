//! Builtin task executors.
//!
//! - `echo` -- returns the task parameters as output
//! - `sleep` -- waits `duration_ms`, optionally fails
//! - `shell` -- runs a command, non-zero exit is a failure
//! - `http` -- performs an HTTP request, status >= 400 is a failure

pub mod echo;
pub mod http;
pub mod shell;
pub mod sleep;

use taskflow_core::task::{TaskDispatcher, TaskExecutor, TimeoutExecutor};

pub use echo::EchoExecutor;
pub use http::HttpExecutor;
pub use shell::ShellExecutor;
pub use sleep::SleepExecutor;

/// Dispatcher with every builtin task type registered.
///
/// With `enforce_timeouts`, each attempt is cut off after the task's
/// `resources.timeout_seconds`.
pub fn builtin_dispatcher(enforce_timeouts: bool) -> TaskDispatcher {
    let mut dispatcher = TaskDispatcher::new();
    register(&mut dispatcher, "echo", EchoExecutor, enforce_timeouts);
    register(&mut dispatcher, "sleep", SleepExecutor, enforce_timeouts);
    register(&mut dispatcher, "shell", ShellExecutor, enforce_timeouts);
    register(&mut dispatcher, "http", HttpExecutor::new(), enforce_timeouts);
    dispatcher
}

fn register<E: TaskExecutor + 'static>(
    dispatcher: &mut TaskDispatcher,
    task_type: &str,
    executor: E,
    enforce_timeouts: bool,
) {
    if enforce_timeouts {
        dispatcher.register(task_type, TimeoutExecutor::new(executor));
    } else {
        dispatcher.register(task_type, executor);
    }
}

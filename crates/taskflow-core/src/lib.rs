//! Scheduling core for taskflow.
//!
//! This crate owns the task graph, the bounded-concurrency graph executor and
//! the workflow coordinator. Task-type behavior is injected through the
//! `TaskExecutor` capability trait; concrete executors live in
//! `taskflow-infra`. Depends only on `taskflow-types` for the data model.

pub mod event;
pub mod task;
pub mod workflow;

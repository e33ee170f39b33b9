//! Shared domain types for taskflow.
//!
//! This crate contains the data model used across the engine, infrastructure
//! and CLI crates: task and workflow configuration, execution records,
//! visualization documents, lifecycle events, and engine settings.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod task;
pub mod visualization;
pub mod workflow;

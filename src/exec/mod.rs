// src/exec/mod.rs

//! Execution layer.
//!
//! - [`executor_loop`] runs scheduled tasks on Tokio and reports their
//!   results back to the runtime via `RuntimeEvent`s.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend`, which tests can replace with a fake.
//! - [`command`] runs shell commands for external transforms and
//!   validators.

pub mod backend;
pub mod command;
pub mod executor_loop;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;

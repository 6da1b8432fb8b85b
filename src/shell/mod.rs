//! External process invocation.
//!
//! Every external operation (environment creation, capability probing,
//! package installation, verification) goes through the [`Executor`] trait
//! so the whole orchestrator can run against scripted results in tests.

pub mod exec;
pub mod scripted;

pub use exec::{CommandSpec, ExecOptions, ExecResult, Executor, SystemExecutor};
pub use scripted::{fail, ok, ScriptedExecutor};

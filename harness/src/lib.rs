//! Host-side harness for a wasm script-execution engine.
//!
//! Loads a sandboxed script engine compiled to WebAssembly, owns its
//! lifecycle (init with a bounded memory arena, garbage collection after
//! every evaluation, idempotent teardown), and exposes a synchronous
//! evaluate-source, get-result-or-error bridge. Everything the engine
//! prints is multiplexed into an observable, append-only journal next to
//! the bridge's own status lines.
//!
//! - **[`loader`]**: module instantiation, readiness, the wasmtime-backed
//!   handle.
//! - **[`controller`]**: the lifecycle state machine that owns the handle.
//! - **[`bridge`]**: the source-in/result-out exchange protocol.
//! - **[`journal`] / [`multiplex`]**: the captured output stream.
//! - **[`status`]**: the `{message, state}` projection for callers.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod harness;
pub mod journal;
pub mod loader;
pub mod logging;
pub mod multiplex;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use bridge::EvalOutcome;
pub use config::{LoadConfig, load_config};
pub use controller::LifecycleState;
pub use error::HarnessError;
pub use harness::Harness;
pub use journal::{EntryKind, Journal, OutputEntry};
pub use status::{StatusReport, StatusReporter};

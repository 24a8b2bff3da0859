//! Abstraction over the engine module's exported entry points.
//!
//! The [`EngineModule`] trait decouples the controller and the bridge from
//! the actual module backend (currently wasmtime, see [`crate::loader`]).
//! Tests use a scripted engine that returns predetermined results without
//! instantiating a module.

use crate::error::HarnessError;

/// Opaque reference to a module-owned result buffer.
///
/// Obtained from [`EngineModule::eval`] and valid until passed to
/// [`EngineModule::release_result`]. Callers must release every reference
/// they obtain, exactly once, before the evaluation call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRef(pub u32);

/// The module entry points the harness consumes, by contract.
pub trait EngineModule {
    /// Invoke the module's init entry point with a memory ceiling in bytes.
    ///
    /// Returns the module's status code: 0 is success, anything else is an
    /// init failure the caller must treat as terminal.
    fn init(&mut self, memory_limit_bytes: u64) -> Result<i32, HarnessError>;

    /// Marshal `source` across the boundary and invoke evaluation.
    ///
    /// Returns a reference to the module-owned result buffer.
    fn eval(&mut self, source: &str) -> Result<ResultRef, HarnessError>;

    /// Decode the referenced result buffer as text.
    fn read_result(&mut self, result: ResultRef) -> Result<String, HarnessError>;

    /// Release a result buffer. Must be called exactly once per reference.
    fn release_result(&mut self, result: ResultRef) -> Result<(), HarnessError>;

    /// Trigger the module's garbage collector. Advisory.
    fn collect(&mut self) -> Result<(), HarnessError>;

    /// Release the module's memory arena. Safe to call more than once on
    /// the module side; the controller still guards against repeat calls.
    fn cleanup(&mut self) -> Result<(), HarnessError>;

    /// Take the lines the module printed since the last drain.
    fn drain_output(&mut self) -> Vec<String>;
}

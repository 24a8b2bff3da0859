//! The harness facade the presentation layer talks to.
//!
//! Composes the journal, the status reporter, and the controller-owned
//! module handle behind the public `run_code` / `clear_output` surface.
//! Teardown runs in `Drop`, so the arena is released however the process
//! unwinds; an explicit [`Harness::shutdown`] does the same thing earlier.

use std::fmt;

use tracing::instrument;

use crate::bridge::{self, EvalOutcome};
use crate::config::LoadConfig;
use crate::controller::{Controller, LifecycleState};
use crate::engine::EngineModule;
use crate::error::HarnessError;
use crate::journal::{EntryKind, Journal, OutputEntry};
use crate::loader;
use crate::multiplex::CaptureGate;
use crate::status::{StatusReport, StatusReporter};

pub struct Harness {
    controller: Controller,
    journal: Journal,
    status: StatusReporter,
    gate: CaptureGate,
}

impl Harness {
    /// Load the engine module described by `config` and initialize it.
    ///
    /// On failure the status reporter and journal reflect the fault before
    /// the error is returned; there is no automatic retry.
    #[instrument(skip_all)]
    pub fn load(
        config: &LoadConfig,
        journal: Journal,
        status: StatusReporter,
        gate: CaptureGate,
    ) -> Result<Self, HarnessError> {
        status.update(LifecycleState::Loading, "Loading engine module...");
        let engine = match loader::load(config) {
            Ok(engine) => engine,
            Err(err) => {
                status.update(LifecycleState::Error, format!("Error: {err}"));
                journal.append(EntryKind::Error, err.to_string());
                return Err(err);
            }
        };
        Self::from_handle(Box::new(engine), config.memory_limit_bytes, journal, status, gate)
    }

    /// Assemble a harness around an already-loaded module handle.
    pub fn from_handle(
        engine: Box<dyn EngineModule>,
        memory_limit_bytes: u64,
        journal: Journal,
        status: StatusReporter,
        gate: CaptureGate,
    ) -> Result<Self, HarnessError> {
        // The handle exists from here on: captured log lines start landing
        // in the journal.
        gate.arm();
        let mut controller = Controller::new(engine, status.clone());
        if let Err(err) = controller.initialize(memory_limit_bytes) {
            journal.append(EntryKind::Error, err.to_string());
            controller.teardown();
            gate.disarm();
            return Err(err);
        }
        journal.append(EntryKind::Info, "Engine runtime initialized");
        journal.append(EntryKind::Info, "Ready to execute code");
        Ok(Self {
            controller,
            journal,
            status,
            gate,
        })
    }

    /// Evaluate source text. One call at a time; callers outside `Ready`
    /// are rejected, not queued.
    pub fn run_code(&mut self, source: &str) -> Result<EvalOutcome, HarnessError> {
        match bridge::evaluate(&mut self.controller, &self.journal, source) {
            Err(err @ HarnessError::NotReady { .. }) => {
                self.journal.append(EntryKind::Error, "Engine not initialized");
                Err(err)
            }
            other => other,
        }
    }

    /// Drop all journal entries.
    pub fn clear_output(&self) {
        self.journal.clear();
    }

    /// Snapshot of the observable output sequence.
    pub fn output(&self) -> Vec<OutputEntry> {
        self.journal.snapshot()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn status(&self) -> StatusReport {
        self.status.current()
    }

    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }

    /// Release the engine's arena and stop capturing output. Idempotent;
    /// also runs on drop.
    pub fn shutdown(&mut self) {
        self.controller.teardown();
        self.gate.disarm();
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("state", &self.controller.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedEngine, ScriptedEval};

    fn scripted_harness(engine: ScriptedEngine) -> Harness {
        Harness::from_handle(
            Box::new(engine),
            1024,
            Journal::new(),
            StatusReporter::new(),
            CaptureGate::new(),
        )
        .expect("harness")
    }

    #[test]
    fn from_handle_reaches_ready_and_announces_it() {
        let harness = scripted_harness(ScriptedEngine::new(vec![]));
        assert_eq!(harness.state(), LifecycleState::Ready);
        assert_eq!(harness.status().state, LifecycleState::Ready);

        let texts: Vec<String> = harness.output().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["Engine runtime initialized", "Ready to execute code"]);
    }

    #[test]
    fn init_failure_surfaces_status_and_journal_entry() {
        let journal = Journal::new();
        let status = StatusReporter::new();
        let gate = CaptureGate::new();
        let engine = ScriptedEngine::new(vec![]).with_init_status(3);
        let recorder = engine.recorder();

        let err = Harness::from_handle(Box::new(engine), 1024, journal.clone(), status.clone(), gate.clone())
            .unwrap_err();
        assert!(matches!(err, HarnessError::Init { status: 3 }));
        assert_eq!(status.current().state, LifecycleState::Error);
        assert_eq!(journal.len(), 1);
        assert!(!gate.is_armed());
        // The handle was still cleaned up.
        assert_eq!(recorder.cleanups(), 1);
    }

    #[test]
    fn clear_output_empties_the_journal() {
        let mut harness = scripted_harness(ScriptedEngine::new(vec![ScriptedEval::Result(
            "4".to_string(),
        )]));
        harness.run_code("2 + 2").expect("run");
        assert!(!harness.output().is_empty());

        harness.clear_output();
        assert!(harness.output().is_empty());
    }

    #[test]
    fn shutdown_then_run_code_is_rejected() {
        let mut harness = scripted_harness(ScriptedEngine::new(vec![]));
        harness.shutdown();
        assert_eq!(harness.state(), LifecycleState::Terminated);

        let err = harness.run_code("2 + 2").unwrap_err();
        assert!(matches!(err, HarnessError::NotReady { .. }));
        let last = harness.output().pop().expect("entry");
        assert_eq!(last.text, "Engine not initialized");
    }

    #[test]
    fn drop_disarms_the_gate() {
        let gate = CaptureGate::new();
        let harness = Harness::from_handle(
            Box::new(ScriptedEngine::new(vec![])),
            1024,
            Journal::new(),
            StatusReporter::new(),
            gate.clone(),
        )
        .expect("harness");
        assert!(gate.is_armed());

        drop(harness);
        assert!(!gate.is_armed());
    }
}

//! Evaluation bridge: one synchronous source-in, result-out exchange.

use tracing::{info, instrument, warn};

use crate::controller::Controller;
use crate::engine::EngineModule;
use crate::error::HarnessError;
use crate::journal::{EntryKind, Journal};

/// Module convention: runtime errors come back as text with this prefix.
/// A legitimate value that happens to start with it is indistinguishable
/// from a fault; kept as-is for compatibility with existing engine builds.
const ERROR_PREFIX: &str = "Error:";

const START_MARKER: &str = "--- Executing code ---";
const COMPLETE_MARKER: &str = "--- Execution complete ---";
const EMPTY_SOURCE: &str = "No code to execute";

/// Classified result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    Value(String),
    Fault(String),
}

impl EvalOutcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Value(text) | Self::Fault(text) => text,
        }
    }
}

/// Evaluate `source`, appending the exchange to the journal.
///
/// One module round-trip and one reclaim per call that crosses the
/// boundary. Blank input is rejected locally without touching the module;
/// a call outside `Ready` is rejected rather than queued. Host-side
/// failures during the exchange are downgraded to a `Fault` so one bad
/// call cannot poison the harness.
#[instrument(skip_all, fields(source_len = source.len()))]
pub fn evaluate(
    controller: &mut Controller,
    journal: &Journal,
    source: &str,
) -> Result<EvalOutcome, HarnessError> {
    if !controller.is_ready() {
        return Err(HarnessError::NotReady {
            state: controller.state(),
        });
    }
    if source.trim().is_empty() {
        journal.append(EntryKind::Error, EMPTY_SOURCE);
        return Ok(EvalOutcome::Fault(EMPTY_SOURCE.to_string()));
    }

    journal.append(EntryKind::Info, START_MARKER);

    let outcome = match exchange(controller.engine_mut(), source) {
        Ok(outcome) => outcome,
        Err(err) => EvalOutcome::Fault(format!("Execution error: {err}")),
    };

    // Lines the engine printed during evaluation go through the process
    // logging channel; the multiplexer mirrors them into the journal while
    // the handle exists.
    for line in controller.engine_mut().drain_output() {
        info!(target: "engine", "{line}");
    }

    match &outcome {
        EvalOutcome::Value(text) => journal.append(EntryKind::Info, format!("Result: {text}")),
        EvalOutcome::Fault(text) => journal.append(EntryKind::Error, text.clone()),
    }

    controller.reclaim();
    journal.append(EntryKind::Info, COMPLETE_MARKER);
    Ok(outcome)
}

/// One marshal → invoke → decode → release round-trip.
///
/// The module-owned result buffer is released exactly once, even when
/// decoding fails.
fn exchange(engine: &mut dyn EngineModule, source: &str) -> Result<EvalOutcome, HarnessError> {
    let reference = engine.eval(source)?;
    let decoded = engine.read_result(reference);
    if let Err(err) = engine.release_result(reference) {
        warn!("failed to release result buffer: {err}");
    }
    Ok(classify(decoded?))
}

fn classify(text: String) -> EvalOutcome {
    if text.starts_with(ERROR_PREFIX) {
        EvalOutcome::Fault(text)
    } else {
        EvalOutcome::Value(text)
    }
}

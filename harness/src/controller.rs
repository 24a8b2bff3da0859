//! Runtime controller: the lifecycle state machine over the module handle.
//!
//! The controller exclusively owns the engine handle. It sequences
//! initialization (allocate the bounded memory arena), periodic reclamation
//! (garbage collection after each evaluation), and teardown (release the
//! arena, exactly once). The bridge borrows the handle through
//! [`Controller::engine_mut`] for the duration of one call.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::EngineModule;
use crate::error::HarnessError;
use crate::status::StatusReporter;

/// Harness lifecycle state. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Loading,
    Initializing,
    Ready,
    Error,
    Terminated,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Terminated)
    }

    /// Transitions are one-directional and nothing leaves a terminal state.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        matches!(
            (self, next),
            (Self::Loading, Self::Initializing)
                | (Self::Loading, Self::Error)
                | (Self::Initializing, Self::Ready)
                | (Self::Initializing, Self::Error)
                | (Self::Ready, Self::Error)
                | (Self::Ready, Self::Terminated)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Owns the module handle and drives its lifecycle.
pub struct Controller {
    engine: Box<dyn EngineModule>,
    state: LifecycleState,
    status: StatusReporter,
    cleaned: bool,
}

impl Controller {
    /// Take ownership of a freshly loaded module handle.
    pub fn new(engine: Box<dyn EngineModule>, status: StatusReporter) -> Self {
        let mut controller = Self {
            engine,
            state: LifecycleState::Loading,
            status,
            cleaned: false,
        };
        controller.advance(LifecycleState::Initializing, "Initializing engine runtime...");
        controller
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    pub(crate) fn engine_mut(&mut self) -> &mut dyn EngineModule {
        self.engine.as_mut()
    }

    /// Invoke the module's init entry point with a memory ceiling in bytes.
    ///
    /// A nonzero status code from the module is terminal for the session.
    pub fn initialize(&mut self, memory_limit_bytes: u64) -> Result<(), HarnessError> {
        if self.state != LifecycleState::Initializing {
            return Err(HarnessError::NotReady { state: self.state });
        }
        match self.engine.init(memory_limit_bytes) {
            Ok(0) => {
                debug!(memory_limit_bytes, "engine runtime initialized");
                self.advance(LifecycleState::Ready, "Engine module loaded successfully!");
                Ok(())
            }
            Ok(status) => {
                self.advance(
                    LifecycleState::Error,
                    format!("Error: engine init failed with status {status}"),
                );
                Err(HarnessError::Init { status })
            }
            Err(err) => {
                self.advance(LifecycleState::Error, format!("Error: {err}"));
                Err(err)
            }
        }
    }

    /// Trigger the module's garbage collector.
    ///
    /// Valid only in `Ready`; ignored in any other state. Called after
    /// every evaluation to bound memory growth across repeated requests.
    pub fn reclaim(&mut self) {
        if !self.is_ready() {
            return;
        }
        if let Err(err) = self.engine.collect() {
            // Advisory by contract; a failed collection fails nothing.
            warn!("reclaim failed: {err}");
        }
    }

    /// Release the module's arena and retire the handle. Idempotent.
    ///
    /// Runs the cleanup entry point from any state that has a handle; the
    /// state advances to `Terminated` only from `Ready`, so `Error` stays
    /// terminal.
    pub fn teardown(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        if let Err(err) = self.engine.cleanup() {
            warn!("engine cleanup failed: {err}");
        }
        if self.state.can_advance_to(LifecycleState::Terminated) {
            self.advance(LifecycleState::Terminated, "Engine shut down");
        }
    }

    fn advance(&mut self, next: LifecycleState, message: impl Into<String>) {
        if !self.state.can_advance_to(next) {
            warn!(from = %self.state, to = %next, "ignoring illegal state transition");
            return;
        }
        self.state = next;
        self.status.update(next, message);
    }
}

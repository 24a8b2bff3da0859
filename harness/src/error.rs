//! Error taxonomy for the harness.
//!
//! `Load` and `Init` are terminal for the session: they move the lifecycle
//! to `Error` and disable evaluation. `NotReady` and `Host` are per-call.
//! Module-reported runtime errors are not errors at this layer at all;
//! they are the `Fault` arm of [`crate::bridge::EvalOutcome`].

use thiserror::Error;

use crate::controller::LifecycleState;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// The engine module could not be located or instantiated.
    #[error("module load failed: {reason}")]
    Load { reason: String },

    /// The module's init entry point returned a nonzero status code.
    #[error("engine init failed with status {status}")]
    Init { status: i32 },

    /// An operation was requested while the harness was not in a state
    /// that permits it. Calls are rejected locally, never queued.
    #[error("operation rejected: harness state is {state}")]
    NotReady { state: LifecycleState },

    /// Host-side failure while marshalling or decoding across the module
    /// boundary, or a trap raised inside the module.
    #[error("host-side failure: {reason}")]
    Host { reason: String },
}

impl HarnessError {
    pub(crate) fn load(reason: impl Into<String>) -> Self {
        Self::Load {
            reason: reason.into(),
        }
    }

    pub(crate) fn host(reason: impl Into<String>) -> Self {
        Self::Host {
            reason: reason.into(),
        }
    }
}

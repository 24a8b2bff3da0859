//! Externally observable lifecycle status.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::controller::LifecycleState;

/// Human-readable message plus the lifecycle state it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub message: String,
    pub state: LifecycleState,
}

/// Pure projection of the lifecycle state for the presentation layer.
///
/// Holds nothing beyond the last reported pair; updated synchronously at
/// every state transition. Cloning shares the underlying report.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    current: Arc<Mutex<StatusReport>>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(StatusReport {
                message: "Loading engine module...".to_string(),
                state: LifecycleState::Loading,
            })),
        }
    }

    pub fn update(&self, state: LifecycleState, message: impl Into<String>) {
        let mut report = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        report.state = state;
        report.message = message.into();
    }

    pub fn current(&self) -> StatusReport {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_loading() {
        let reporter = StatusReporter::new();
        let report = reporter.current();
        assert_eq!(report.state, LifecycleState::Loading);
        assert!(report.message.contains("Loading"));
    }

    #[test]
    fn update_replaces_the_pair() {
        let reporter = StatusReporter::new();
        reporter.update(LifecycleState::Ready, "Engine module loaded successfully!");

        let report = reporter.current();
        assert_eq!(report.state, LifecycleState::Ready);
        assert_eq!(report.message, "Engine module loaded successfully!");
    }

    #[test]
    fn clones_observe_the_same_report() {
        let reporter = StatusReporter::new();
        let observer = reporter.clone();
        reporter.update(LifecycleState::Error, "Error: boom");
        assert_eq!(observer.current().state, LifecycleState::Error);
    }
}

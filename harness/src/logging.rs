//! Process-wide tracing setup.
//!
//! Installs two layers once at startup: the usual compact `fmt` layer to
//! stderr (driven by `RUST_LOG`, default `warn`) and the journal layer that
//! multiplexes captured events into the harness output. The returned gate
//! is handed to the harness so capture only happens while a module handle
//! exists. There is no uninstall; the harness owns the process.

use tracing_subscriber::{EnvFilter, Layer as _, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::journal::Journal;
use crate::multiplex::{CaptureGate, JournalLayer};

/// Initialize tracing for the process and register the journal sink.
///
/// The env filter scopes the stderr layer only; the journal layer must see
/// every event while armed, whatever `RUST_LOG` says.
///
/// # Example
/// ```bash
/// RUST_LOG=harness=debug console repl
/// ```
pub fn init(journal: Journal) -> CaptureGate {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let gate = CaptureGate::new();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_filter(filter),
        )
        .with(JournalLayer::new(journal, gate.clone()))
        .init();

    gate
}

//! Loader and bridge tests against real wasm fixtures.
//!
//! Each fixture is a small wat module written to a temp asset dir and run
//! through the actual wasmtime path: resolution, instantiation, readiness,
//! marshalling through the module's C allocator, and decode/release of the
//! result buffer. The fixtures return canned result strings; evaluation
//! semantics belong to real engine builds, not to these tests.

use std::fs;
use std::path::Path;

use harness::multiplex::CaptureGate;
use harness::{
    EvalOutcome, Harness, HarnessError, Journal, LifecycleState, LoadConfig, StatusReporter,
};

/// Fixture returning `"4"` for every evaluation.
const VALUE_ENGINE: &str = r#"
(module
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 4096))
  (func (export "malloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $next))
    (global.set $next (i32.add (global.get $next) (local.get $len)))
    (local.get $ptr))
  (func (export "free") (param i32))
  (func (export "engine_init") (param i32) (result i32) (i32.const 0))
  (func (export "engine_eval") (param i32) (result i32) (i32.const 16))
  (func (export "engine_free_string") (param i32))
  (func (export "engine_gc"))
  (func (export "engine_cleanup"))
  (data (i32.const 16) "4\00"))
"#;

/// Fixture reporting a module-side runtime error.
const FAULT_ENGINE: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "malloc") (param i32) (result i32) (i32.const 4096))
  (func (export "free") (param i32))
  (func (export "engine_init") (param i32) (result i32) (i32.const 0))
  (func (export "engine_eval") (param i32) (result i32) (i32.const 16))
  (func (export "engine_free_string") (param i32))
  (func (export "engine_gc"))
  (func (export "engine_cleanup"))
  (data (i32.const 16) "Error: 'nonexistentFn' is not defined\00"))
"#;

/// Fixture echoing the marshalled source back as the result.
const ECHO_ENGINE: &str = r#"
(module
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 4096))
  (func (export "malloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $next))
    (global.set $next (i32.add (global.get $next) (local.get $len)))
    (local.get $ptr))
  (func (export "free") (param i32))
  (func (export "engine_init") (param i32) (result i32) (i32.const 0))
  (func (export "engine_eval") (param $src i32) (result i32) (local.get $src))
  (func (export "engine_free_string") (param i32))
  (func (export "engine_gc"))
  (func (export "engine_cleanup"))
)
"#;

/// Reactor-convention fixture: init succeeds only after the one-shot
/// `_initialize` readiness call ran.
const REACTOR_ENGINE: &str = r#"
(module
  (memory (export "memory") 1)
  (global $armed (mut i32) (i32.const 0))
  (func (export "_initialize") (global.set $armed (i32.const 1)))
  (func (export "malloc") (param i32) (result i32) (i32.const 4096))
  (func (export "free") (param i32))
  (func (export "engine_init") (param i32) (result i32)
    (select (i32.const 0) (i32.const 7) (global.get $armed)))
  (func (export "engine_eval") (param i32) (result i32) (i32.const 16))
  (func (export "engine_free_string") (param i32))
  (func (export "engine_gc"))
  (func (export "engine_cleanup"))
  (data (i32.const 16) "ready\00"))
"#;

/// Fixture whose init entry point reports failure.
const FAILING_INIT_ENGINE: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "malloc") (param i32) (result i32) (i32.const 4096))
  (func (export "free") (param i32))
  (func (export "engine_init") (param i32) (result i32) (i32.const 5))
  (func (export "engine_eval") (param i32) (result i32) (i32.const 16))
  (func (export "engine_free_string") (param i32))
  (func (export "engine_gc"))
  (func (export "engine_cleanup"))
  (data (i32.const 16) "unreachable\00"))
"#;

/// Fixture printing to stdout during evaluation.
const PRINTING_ENGINE: &str = r#"
(module
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (func (export "malloc") (param i32) (result i32) (i32.const 8192))
  (func (export "free") (param i32))
  (func (export "engine_init") (param i32) (result i32) (i32.const 0))
  (func (export "engine_eval") (param i32) (result i32)
    (i32.store (i32.const 0) (i32.const 64))
    (i32.store (i32.const 4) (i32.const 6))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 32)))
    (i32.const 128))
  (func (export "engine_free_string") (param i32))
  (func (export "engine_gc"))
  (func (export "engine_cleanup"))
  (data (i32.const 64) "hello\n")
  (data (i32.const 128) "done\00"))
"#;

/// Fixture with no readiness signal at all.
const SILENT_MODULE: &str = r#"
(module
  (memory (export "memory") 1))
"#;

fn write_engine(dir: &Path, wat: &str) -> LoadConfig {
    fs::write(dir.join("engine.wasm"), wat).expect("write fixture");
    LoadConfig {
        asset_dir: dir.to_path_buf(),
        ..LoadConfig::default()
    }
}

fn load_harness(config: &LoadConfig) -> Result<Harness, HarnessError> {
    Harness::load(
        config,
        Journal::new(),
        StatusReporter::new(),
        CaptureGate::new(),
    )
}

#[test]
fn value_result_round_trips() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_engine(temp.path(), VALUE_ENGINE);

    let mut harness = load_harness(&config).expect("load");
    assert_eq!(harness.state(), LifecycleState::Ready);

    let outcome = harness.run_code("2 + 2").expect("evaluate");
    assert_eq!(outcome, EvalOutcome::Value("4".to_string()));
}

#[test]
fn error_prefixed_result_classifies_as_fault() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_engine(temp.path(), FAULT_ENGINE);

    let mut harness = load_harness(&config).expect("load");
    let outcome = harness.run_code("nonexistentFn()").expect("evaluate");
    assert!(outcome.is_fault());
    assert!(outcome.text().starts_with("Error:"));
    assert_eq!(harness.state(), LifecycleState::Ready);
}

#[test]
fn source_marshals_through_guest_memory_intact() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_engine(temp.path(), ECHO_ENGINE);

    let mut harness = load_harness(&config).expect("load");
    let source = "const π = Math.PI; π * 2";
    let outcome = harness.run_code(source).expect("evaluate");
    assert_eq!(outcome, EvalOutcome::Value(source.to_string()));
}

#[test]
fn reactor_readiness_path_is_resolved_by_the_loader() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_engine(temp.path(), REACTOR_ENGINE);

    // Init returns 7 unless `_initialize` ran first, so reaching `Ready`
    // proves the loader took the one-shot readiness path.
    let harness = load_harness(&config).expect("load");
    assert_eq!(harness.state(), LifecycleState::Ready);
}

#[test]
fn nonzero_init_status_is_terminal() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_engine(temp.path(), FAILING_INIT_ENGINE);

    let status = StatusReporter::new();
    let err = Harness::load(&config, Journal::new(), status.clone(), CaptureGate::new())
        .unwrap_err();
    assert!(matches!(err, HarnessError::Init { status: 5 }));
    assert_eq!(status.current().state, LifecycleState::Error);
}

#[test]
fn guest_stdout_reaches_the_journal_while_armed() {
    use tracing_subscriber::layer::SubscriberExt;

    use harness::multiplex::JournalLayer;

    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_engine(temp.path(), PRINTING_ENGINE);

    let journal = Journal::new();
    let gate = CaptureGate::new();
    let subscriber = tracing_subscriber::registry()
        .with(JournalLayer::new(journal.clone(), gate.clone()));

    let mut harness = Harness::load(&config, journal.clone(), StatusReporter::new(), gate)
        .expect("load");
    let outcome = tracing::subscriber::with_default(subscriber, || harness.run_code("print()"))
        .expect("evaluate");
    assert_eq!(outcome, EvalOutcome::Value("done".to_string()));

    let texts: Vec<String> = journal.snapshot().into_iter().map(|e| e.text).collect();
    assert!(texts.contains(&"hello".to_string()), "got {texts:?}");
}

#[test]
fn missing_entry_point_is_a_load_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_engine(temp.path(), SILENT_MODULE);

    let err = load_harness(&config).unwrap_err();
    assert!(matches!(err, HarnessError::Load { .. }));
    assert!(err.to_string().contains("engine_init"));
}

#[test]
fn missing_asset_is_a_load_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = LoadConfig {
        asset_dir: temp.path().to_path_buf(),
        ..LoadConfig::default()
    };

    let journal = Journal::new();
    let status = StatusReporter::new();
    let err = Harness::load(&config, journal.clone(), status.clone(), CaptureGate::new())
        .unwrap_err();
    assert!(matches!(err, HarnessError::Load { .. }));
    assert_eq!(status.current().state, LifecycleState::Error);
    assert_eq!(journal.len(), 1, "load failure is surfaced in the journal");
}

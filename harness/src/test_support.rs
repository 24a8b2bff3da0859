//! Scripted engine for tests.
//!
//! Plays back predetermined evaluation results without instantiating a
//! module, and records every entry-point call so tests can assert on
//! buffer discipline (one release per result, no leaks) and call ordering.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::{EngineModule, ResultRef};
use crate::error::HarnessError;

/// One scripted evaluation.
#[derive(Debug, Clone)]
pub enum ScriptedEval {
    /// Hand out a buffer holding this text.
    Result(String),
    /// Trap during evaluation, before any result buffer exists.
    Trap(String),
    /// Hand out a buffer whose decode fails.
    Undecodable(String),
}

/// Entry-point calls observed by the scripted engine, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Init { memory_limit_bytes: u64 },
    Eval { source: String },
    Read { reference: u32 },
    Release { reference: u32 },
    Collect,
    Cleanup,
}

/// Shareable view of the calls a [`ScriptedEngine`] received.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    leaked: Arc<Mutex<usize>>,
}

impl CallRecorder {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().clone()
    }

    pub fn evals(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Eval { .. }))
    }

    pub fn releases(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Release { .. }))
    }

    pub fn collects(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Collect))
    }

    pub fn cleanups(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Cleanup))
    }

    /// Result buffers handed out and never released.
    pub fn leaked(&self) -> usize {
        *self
            .leaked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.lock().iter().filter(|call| pred(call)).count()
    }

    fn record(&self, call: EngineCall) {
        self.lock().push(call);
    }

    fn set_leaked(&self, outstanding: usize) {
        *self
            .leaked
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = outstanding;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EngineCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ScriptedBuffer {
    text: String,
    decodable: bool,
}

/// [`EngineModule`] backed by a script instead of a module instance.
pub struct ScriptedEngine {
    init_status: i32,
    init_trap: Option<String>,
    script: VecDeque<ScriptedEval>,
    output: VecDeque<Vec<String>>,
    buffers: HashMap<u32, ScriptedBuffer>,
    next_reference: u32,
    recorder: CallRecorder,
}

impl ScriptedEngine {
    pub fn new(script: Vec<ScriptedEval>) -> Self {
        Self {
            init_status: 0,
            init_trap: None,
            script: script.into(),
            output: VecDeque::new(),
            buffers: HashMap::new(),
            next_reference: 0x1000,
            recorder: CallRecorder::default(),
        }
    }

    /// Status code init will report (default 0).
    pub fn with_init_status(mut self, status: i32) -> Self {
        self.init_status = status;
        self
    }

    /// Make init trap instead of returning a status.
    pub fn with_init_trap(mut self, reason: impl Into<String>) -> Self {
        self.init_trap = Some(reason.into());
        self
    }

    /// Queue lines for the next output drain.
    pub fn with_output(mut self, lines: Vec<String>) -> Self {
        self.output.push_back(lines);
        self
    }

    pub fn recorder(&self) -> CallRecorder {
        self.recorder.clone()
    }

    fn sync_leaked(&self) {
        self.recorder.set_leaked(self.buffers.len());
    }
}

impl EngineModule for ScriptedEngine {
    fn init(&mut self, memory_limit_bytes: u64) -> Result<i32, HarnessError> {
        self.recorder.record(EngineCall::Init { memory_limit_bytes });
        if let Some(reason) = &self.init_trap {
            return Err(HarnessError::host(reason.clone()));
        }
        Ok(self.init_status)
    }

    fn eval(&mut self, source: &str) -> Result<ResultRef, HarnessError> {
        self.recorder.record(EngineCall::Eval {
            source: source.to_string(),
        });
        match self.script.pop_front() {
            None => Err(HarnessError::host("scripted engine exhausted")),
            Some(ScriptedEval::Trap(reason)) => Err(HarnessError::host(reason)),
            Some(ScriptedEval::Result(text)) => {
                self.next_reference += 1;
                self.buffers.insert(
                    self.next_reference,
                    ScriptedBuffer {
                        text,
                        decodable: true,
                    },
                );
                self.sync_leaked();
                Ok(ResultRef(self.next_reference))
            }
            Some(ScriptedEval::Undecodable(text)) => {
                self.next_reference += 1;
                self.buffers.insert(
                    self.next_reference,
                    ScriptedBuffer {
                        text,
                        decodable: false,
                    },
                );
                self.sync_leaked();
                Ok(ResultRef(self.next_reference))
            }
        }
    }

    fn read_result(&mut self, result: ResultRef) -> Result<String, HarnessError> {
        self.recorder.record(EngineCall::Read {
            reference: result.0,
        });
        match self.buffers.get(&result.0) {
            None => Err(HarnessError::host("read of unknown result reference")),
            Some(buffer) if !buffer.decodable => {
                Err(HarnessError::host("result buffer is not decodable"))
            }
            Some(buffer) => Ok(buffer.text.clone()),
        }
    }

    fn release_result(&mut self, result: ResultRef) -> Result<(), HarnessError> {
        self.recorder.record(EngineCall::Release {
            reference: result.0,
        });
        if self.buffers.remove(&result.0).is_none() {
            return Err(HarnessError::host("double free of result reference"));
        }
        self.sync_leaked();
        Ok(())
    }

    fn collect(&mut self) -> Result<(), HarnessError> {
        self.recorder.record(EngineCall::Collect);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), HarnessError> {
        self.recorder.record(EngineCall::Cleanup);
        Ok(())
    }

    fn drain_output(&mut self) -> Vec<String> {
        self.output.pop_front().unwrap_or_default()
    }
}

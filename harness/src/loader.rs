//! Module loading and the wasmtime-backed engine handle.
//!
//! [`load`] resolves the engine binary through the config's asset resolver,
//! instantiates it with WASI linked (guest stdout goes into an in-memory
//! pipe for the output multiplexer), waits for readiness, and hands back a
//! [`WasmEngine`] implementing [`EngineModule`]. Loading does not touch the
//! lifecycle state; that is the controller's job once it owns the handle.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument, warn};
use wasi_common::WasiCtx;
use wasi_common::pipe::WritePipe;
use wasmtime::{
    Engine, Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams, WasmResults,
};
use wasmtime_wasi::sync::WasiCtxBuilder;

use crate::config::LoadConfig;
use crate::engine::{EngineModule, ResultRef};
use crate::error::HarnessError;

/// Entry points the module must export, by contract.
const INIT_EXPORT: &str = "engine_init";
const EVAL_EXPORT: &str = "engine_eval";
const FREE_STRING_EXPORT: &str = "engine_free_string";
const GC_EXPORT: &str = "engine_gc";
const CLEANUP_EXPORT: &str = "engine_cleanup";

/// C allocator exports used to marshal source text into guest memory.
const ALLOC_EXPORT: &str = "malloc";
const FREE_EXPORT: &str = "free";

/// One-shot readiness entry point of WASI reactor builds.
const READY_EXPORT: &str = "_initialize";

const MEMORY_EXPORT: &str = "memory";

struct HostState {
    wasi: WasiCtx,
}

type SharedBuffer = Arc<RwLock<Vec<u8>>>;

/// Handle to an instantiated engine module.
///
/// Exclusively owned by the runtime controller; every other component
/// reaches the module through the [`EngineModule`] trait on this handle.
pub struct WasmEngine {
    store: Store<HostState>,
    memory: Memory,
    init_fn: TypedFunc<u32, i32>,
    eval_fn: TypedFunc<u32, u32>,
    free_string_fn: TypedFunc<u32, ()>,
    gc_fn: TypedFunc<(), ()>,
    cleanup_fn: TypedFunc<(), ()>,
    alloc_fn: TypedFunc<u32, u32>,
    free_fn: TypedFunc<u32, ()>,
    stdout: SharedBuffer,
    output_limit_bytes: usize,
}

/// Instantiate the engine module described by `config`.
#[instrument(skip_all, fields(module = %config.module))]
pub fn load(config: &LoadConfig) -> Result<WasmEngine, HarnessError> {
    let path = config.resolve(&config.module);
    debug!(path = %path.display(), "loading engine module");

    let engine = Engine::default();
    let module = Module::from_file(&engine, &path)
        .map_err(|err| HarnessError::load(format!("compile {}: {err:#}", path.display())))?;

    let stdout: SharedBuffer = Arc::new(RwLock::new(Vec::new()));
    let wasi = WasiCtxBuilder::new()
        .stdout(Box::new(WritePipe::from_shared(stdout.clone())))
        .inherit_stderr()
        .build();
    let mut store = Store::new(&engine, HostState { wasi });

    let mut linker: Linker<HostState> = Linker::new(&engine);
    wasmtime_wasi::add_to_linker(&mut linker, |state| &mut state.wasi)
        .map_err(|err| HarnessError::load(format!("link wasi: {err:#}")))?;

    let instance = linker
        .instantiate(&mut store, &module)
        .map_err(|err| HarnessError::load(format!("instantiate {}: {err:#}", path.display())))?;

    await_ready(&mut store, &instance)?;

    let memory = instance
        .get_memory(&mut store, MEMORY_EXPORT)
        .ok_or_else(|| HarnessError::load("module does not export linear memory"))?;

    let engine = WasmEngine {
        init_fn: typed_export(&mut store, &instance, INIT_EXPORT)?,
        eval_fn: typed_export(&mut store, &instance, EVAL_EXPORT)?,
        free_string_fn: typed_export(&mut store, &instance, FREE_STRING_EXPORT)?,
        gc_fn: typed_export(&mut store, &instance, GC_EXPORT)?,
        cleanup_fn: typed_export(&mut store, &instance, CLEANUP_EXPORT)?,
        alloc_fn: typed_export(&mut store, &instance, ALLOC_EXPORT)?,
        free_fn: typed_export(&mut store, &instance, FREE_EXPORT)?,
        store,
        memory,
        stdout,
        output_limit_bytes: config.output_limit_bytes,
    };
    debug!("engine module ready");
    Ok(engine)
}

/// Wait for the module to signal internal readiness.
///
/// Two delivery paths, resolved here so callers never branch: reactor
/// builds require a one-shot `_initialize` call first; either way the main
/// export must then be present.
fn await_ready(store: &mut Store<HostState>, instance: &Instance) -> Result<(), HarnessError> {
    if let Some(ready) = instance.get_func(&mut *store, READY_EXPORT) {
        debug!("invoking one-shot readiness entry point");
        let ready = ready
            .typed::<(), ()>(&mut *store)
            .map_err(|err| HarnessError::load(format!("mistyped `{READY_EXPORT}`: {err:#}")))?;
        ready
            .call(&mut *store, ())
            .map_err(|err| HarnessError::load(format!("readiness call failed: {err:#}")))?;
    }
    if instance.get_func(&mut *store, INIT_EXPORT).is_none() {
        return Err(HarnessError::load(format!(
            "module never signaled readiness: missing export `{INIT_EXPORT}`"
        )));
    }
    Ok(())
}

fn typed_export<P, R>(
    store: &mut Store<HostState>,
    instance: &Instance,
    name: &str,
) -> Result<TypedFunc<P, R>, HarnessError>
where
    P: WasmParams,
    R: WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|err| HarnessError::load(format!("missing or mistyped export `{name}`: {err:#}")))
}

impl WasmEngine {
    fn write_c_string(&mut self, ptr: u32, bytes: &[u8]) -> Result<(), HarnessError> {
        let at = ptr as usize;
        self.memory
            .write(&mut self.store, at, bytes)
            .and_then(|()| self.memory.write(&mut self.store, at + bytes.len(), &[0]))
            .map_err(|err| HarnessError::host(format!("write source into module memory: {err}")))
    }
}

impl EngineModule for WasmEngine {
    fn init(&mut self, memory_limit_bytes: u64) -> Result<i32, HarnessError> {
        let limit = u32::try_from(memory_limit_bytes)
            .map_err(|_| HarnessError::host("memory ceiling exceeds the module address space"))?;
        self.init_fn
            .call(&mut self.store, limit)
            .map_err(|err| HarnessError::host(format!("init trapped: {err:#}")))
    }

    fn eval(&mut self, source: &str) -> Result<ResultRef, HarnessError> {
        let bytes = source.as_bytes();
        // C-string convention: an interior NUL would silently truncate the
        // program on the guest side.
        if bytes.contains(&0) {
            return Err(HarnessError::host("source contains a NUL byte"));
        }
        let len = u32::try_from(bytes.len() + 1)
            .map_err(|_| HarnessError::host("source too large to marshal"))?;

        let ptr = self
            .alloc_fn
            .call(&mut self.store, len)
            .map_err(|err| HarnessError::host(format!("allocate source buffer: {err:#}")))?;
        if ptr == 0 {
            return Err(HarnessError::host("module allocator returned a null pointer"));
        }

        let result = self.write_c_string(ptr, bytes).and_then(|()| {
            self.eval_fn
                .call(&mut self.store, ptr)
                .map_err(|err| HarnessError::host(format!("eval trapped: {err:#}")))
        });

        // The source buffer is ours, not part of the eval result; free it
        // whatever evaluation did.
        if let Err(err) = self.free_fn.call(&mut self.store, ptr) {
            warn!("failed to free source buffer: {err:#}");
        }

        let result = result?;
        if result == 0 {
            return Err(HarnessError::host("module returned a null result"));
        }
        Ok(ResultRef(result))
    }

    fn read_result(&mut self, result: ResultRef) -> Result<String, HarnessError> {
        let start = result.0 as usize;
        let data = self.memory.data(&self.store);
        let tail = data
            .get(start..)
            .ok_or_else(|| HarnessError::host("result pointer out of bounds"))?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| HarnessError::host("result string is not NUL-terminated"))?;
        // The module's native encoding is UTF-8; decode lossily, as the
        // reference host does.
        Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
    }

    fn release_result(&mut self, result: ResultRef) -> Result<(), HarnessError> {
        self.free_string_fn
            .call(&mut self.store, result.0)
            .map_err(|err| HarnessError::host(format!("free_string trapped: {err:#}")))
    }

    fn collect(&mut self) -> Result<(), HarnessError> {
        self.gc_fn
            .call(&mut self.store, ())
            .map_err(|err| HarnessError::host(format!("gc trapped: {err:#}")))
    }

    fn cleanup(&mut self) -> Result<(), HarnessError> {
        self.cleanup_fn
            .call(&mut self.store, ())
            .map_err(|err| HarnessError::host(format!("cleanup trapped: {err:#}")))
    }

    fn drain_output(&mut self) -> Vec<String> {
        let mut buffer = self
            .stdout
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if buffer.is_empty() {
            return Vec::new();
        }
        let taken = std::mem::take(&mut *buffer);
        drop(buffer);

        let (kept, dropped) = if taken.len() > self.output_limit_bytes {
            (
                &taken[..self.output_limit_bytes],
                taken.len() - self.output_limit_bytes,
            )
        } else {
            (&taken[..], 0)
        };
        let text = String::from_utf8_lossy(kept);
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        if dropped > 0 {
            warn!(dropped, "engine output truncated");
            lines.push(format!("[engine output truncated {dropped} bytes]"));
        }
        lines
    }
}

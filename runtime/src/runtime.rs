//! The runtime — wasmtime engine, compiled guest module, and `serve`.
//!
//! A `Runtime` compiles and validates the guest once, then serves each
//! downstream request on a fresh instance with fresh handle tables. The
//! entry sequence per request: loop check, context bind, link, instantiate,
//! `_start`, collect the recorded response.

use std::path::Path;
use std::sync::Arc;

use http::{Request, Response, StatusCode};
use wasmtime::{Config, Engine, Linker, Module, Store};

use fastlike_hostapi::{BackendResolver, DefaultBackends};

use crate::abi::register_abi;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::instance::{is_looped, GuestCtx, Instance};
use crate::validation::validate_module;

/// The host runtime for one guest program.
pub struct Runtime {
    engine: Engine,
    module: Module,
    config: RuntimeConfig,
    backends: Arc<dyn BackendResolver>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Runtime {
    /// Create a runtime from guest bytecode (`.wasm` binary or WAT text).
    pub fn new(wasm_bytes: &[u8], config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let engine = create_engine(&config)?;
        let module = Module::new(&engine, wasm_bytes)?;
        validate_module(&module)?;
        Ok(Self {
            engine,
            module,
            config,
            backends: Arc::new(DefaultBackends),
        })
    }

    /// Load a guest from a `.wasm` file path.
    pub fn from_file(path: &Path, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let engine = create_engine(&config)?;
        let module = Module::from_file(&engine, path)?;
        validate_module(&module)?;
        Ok(Self {
            engine,
            module,
            config,
            backends: Arc::new(DefaultBackends),
        })
    }

    /// Replace the resolver that maps backend names to handlers for guest
    /// sub-requests.
    pub fn with_backends(mut self, backends: Arc<dyn BackendResolver>) -> Self {
        self.backends = backends;
        self
    }

    /// Serve one downstream request — the primary entry point.
    ///
    /// Every call runs a fresh guest instance; the instance is discarded
    /// when this returns. Guest traps and host faults come back as HTTP 500
    /// with a diagnostic body, and requests that already passed through a
    /// fastlike host are refused with HTTP 508 before the guest runs.
    pub fn serve(&self, req: Request<Vec<u8>>) -> Response<Vec<u8>> {
        if is_looped(req.headers()) {
            tracing::debug!("cdn-loop marker on ingress, refusing request");
            return loop_detected();
        }

        match self.invoke(req) {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!(error = %err, "instance faulted");
                fault_response(&err)
            }
        }
    }

    fn invoke(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, RuntimeError> {
        let ctx = GuestCtx::new(req, self.backends.clone(), &self.config)?;
        let mut store = Store::new(&self.engine, ctx);

        // Linkers are cheap and the host calls close over per-request state,
        // so each invocation links from scratch.
        let mut linker: Linker<GuestCtx> = Linker::new(&self.engine);
        wasmtime_wasi::preview1::add_to_linker_sync(&mut linker, |ctx: &mut GuestCtx| {
            &mut ctx.wasi
        })?;
        register_abi(&mut linker)?;

        let wasm = linker.instantiate(&mut store, &self.module)?;
        Instance { store, wasm }.run()
    }
}

/// Create a wasmtime engine for the runtime.
fn create_engine(config: &RuntimeConfig) -> Result<Engine, RuntimeError> {
    let mut wasm_config = Config::new();

    if config.enable_cache {
        // Cache failures only cost recompilation.
        if let Err(err) = wasm_config.cache_config_load_default() {
            tracing::debug!(error = %err, "wasmtime code cache unavailable");
        }
    }

    Ok(Engine::new(&wasm_config)?)
}

fn loop_detected() -> Response<Vec<u8>> {
    let body = concat!(
        "Loop detected! This request has already been through a fastlike host.\n",
        "A backend handler is probably routing sub-requests back into the server.\n",
    );
    let mut resp = Response::new(body.as_bytes().to_vec());
    *resp.status_mut() = StatusCode::LOOP_DETECTED;
    resp
}

fn fault_response(err: &RuntimeError) -> Response<Vec<u8>> {
    let body = format!(
        "Error running the guest program.\n\
         The instance was torn down before a response was sent; the trap below \
         ended it. There may be more detail in the host logs.\n\n{}\n",
        err
    );
    let mut resp = Response::new(body.into_bytes());
    *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    resp
}

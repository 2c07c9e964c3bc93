//! Per-request instance state and guest dispatch.
//!
//! A `GuestCtx` lives inside the wasmtime `Store` for exactly one
//! request/response pair: three empty handle tables, the downstream request
//! waiting for `body_downstream_get`, a slot for the response the guest
//! flushes with `send_downstream`, and the backend resolver for
//! sub-requests. The `Instance` wrapper is consumed by `run`, so an instance
//! cannot be invoked twice.

use std::io::Read;
use std::net::IpAddr;
use std::sync::Arc;

use http::{HeaderMap, Request, Response};
use url::Url;
use wasmtime::Store;
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::WasiCtxBuilder;

use fastlike_hostapi::{
    BackendResolver, BodyHandles, HeaderMultimap, RequestHandles, ResponseHandles,
};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;

/// The loop token injected on outbound sub-requests and matched on ingress.
pub(crate) const CDN_LOOP_TOKEN: &str = "fastlike";

/// The downstream request as bound into an instance: method, absolute URL,
/// headers, and a one-shot body reader.
pub(crate) struct DownstreamRequest {
    pub method: http::Method,
    pub url: Url,
    pub headers: HeaderMultimap,
    body: Option<Box<dyn Read + Send>>,
}

impl DownstreamRequest {
    /// Bind a server-provided request, reconstructing the absolute URL.
    ///
    /// Server requests usually carry an origin-form URI; the host and scheme
    /// come from the Host header (or URI authority) and the connection's TLS
    /// state.
    fn bind(req: Request<Vec<u8>>, tls: bool) -> Result<Self, RuntimeError> {
        let (parts, body) = req.into_parts();

        let scheme = parts
            .uri
            .scheme_str()
            .unwrap_or(if tls { "https" } else { "http" })
            .to_string();
        let host = parts
            .uri
            .authority()
            .map(|a| a.to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(http::header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "localhost".to_string());
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let url = Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))
            .map_err(|e| RuntimeError::Downstream(format!("bad downstream url: {}", e)))?;

        Ok(Self {
            method: parts.method,
            url,
            headers: HeaderMultimap::from(&parts.headers),
            body: Some(Box::new(std::io::Cursor::new(body))),
        })
    }

    /// Detach the body reader. A second take observes an already-drained
    /// body.
    pub fn take_body(&mut self) -> Box<dyn Read + Send> {
        self.body
            .take()
            .unwrap_or_else(|| Box::new(std::io::empty()))
    }
}

/// Per-request mutable state held in the wasmtime `Store`.
///
/// Created fresh for each served request and dropped, tables and all, when
/// the instance terminates.
pub struct GuestCtx {
    pub(crate) requests: RequestHandles,
    pub(crate) responses: ResponseHandles,
    pub(crate) bodies: BodyHandles,
    pub(crate) downstream: DownstreamRequest,
    /// The response recorded by `send_downstream`; `None` until the guest
    /// flushes one.
    pub(crate) response: Option<Response<Vec<u8>>>,
    pub(crate) backends: Arc<dyn BackendResolver>,
    pub(crate) client_addr: IpAddr,
    pub(crate) wasi: WasiP1Ctx,
}

impl GuestCtx {
    pub(crate) fn new(
        req: Request<Vec<u8>>,
        backends: Arc<dyn BackendResolver>,
        config: &RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        let downstream = DownstreamRequest::bind(req, config.tls)?;
        let wasi = WasiCtxBuilder::new()
            .inherit_stdout()
            .inherit_stderr()
            .build_p1();
        Ok(Self {
            requests: RequestHandles::new(),
            responses: ResponseHandles::new(),
            bodies: BodyHandles::new(),
            downstream,
            response: None,
            backends,
            client_addr: config.client_addr,
            wasi,
        })
    }
}

/// One linked guest instance, good for exactly one invocation.
pub(crate) struct Instance {
    pub(crate) store: Store<GuestCtx>,
    pub(crate) wasm: wasmtime::Instance,
}

impl Instance {
    /// Invoke the guest's `_start` and return the response it flushed
    /// downstream. Consumes the instance.
    pub(crate) fn run(mut self) -> Result<Response<Vec<u8>>, RuntimeError> {
        let entry = self
            .wasm
            .get_typed_func::<(), ()>(&mut self.store, "_start")?;

        entry
            .call(&mut self.store, ())
            .map_err(|e| RuntimeError::GuestTrapped(format!("{}", e)))?;

        // A guest that returned without flushing anything downstream gets the
        // same treatment as a server handler that never wrote: empty 200.
        let ctx = self.store.into_data();
        Ok(ctx.response.unwrap_or_else(|| Response::new(Vec::new())))
    }
}

/// Ingress loop check: join the `cdn-loop` values NUL-separated and match
/// the loop token case-insensitively.
pub(crate) fn is_looped(headers: &HeaderMap) -> bool {
    let joined = headers
        .get_all("cdn-loop")
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("\x00");
    joined.contains(CDN_LOOP_TOKEN)
}

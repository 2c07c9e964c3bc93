//! `fastlike-hostapi` — host-side handle plane for the fastlike edge-compute ABI.
//!
//! This crate holds everything the ABI runtime manipulates on behalf of the
//! guest, with no dependency on the WebAssembly engine:
//!
//! - `XqdStatus` / `HttpVersion` — the wire-observable status and version codes
//! - `HostError` — host-side error type with `XqdStatus` conversion
//! - `HeaderMultimap` — canonical-cased, order-preserving header storage
//! - `Body` / `BodyHandles` — buffered, reader- and writer-backed byte streams
//! - `RequestHandles` / `ResponseHandles` — dense per-instance handle tables
//! - `BackendResolver` — the contract by which sub-requests reach a handler,
//!   plus the default 502 responder and the built-in geolocation backend
//!
//! The wasmtime side of the house lives in `fastlike-runtime`, which marshals
//! guest memory in and out of the types defined here.

pub mod status;
pub mod error;
pub mod headers;
pub mod body;
pub mod handles;
pub mod backend;

// Re-export commonly used types at the crate root.
pub use status::{HttpVersion, XqdStatus};
pub use error::HostError;
pub use headers::HeaderMultimap;
pub use body::Body;
pub use handles::{BodyHandles, RequestHandle, RequestHandles, ResponseHandle, ResponseHandles};
pub use backend::{BackendResolver, DefaultBackends, Handler};

//! `fastlike-runtime` — Wasmtime-based host runtime for the fastlike
//! edge-compute ABI.
//!
//! The runtime loads a compiled guest program and serves one HTTP
//! request/response pair per invocation by exposing the `fastly_*` (and
//! legacy `env`) host-call surface to the guest. It enforces:
//!
//! - **Isolation:** a fresh instance and fresh handle tables per request
//! - **ABI validation:** `_start` and `memory` exports checked before use
//! - **Loop protection:** `cdn-loop: fastlike` checked on ingress, injected
//!   on every outbound sub-request
//! - **Fault containment:** guest traps and host faults become an HTTP 500
//!   downstream; the guest never observes them
//!
//! The primary entry point is [`Runtime::serve`].

pub mod error;
pub mod config;
pub mod memory;
pub mod multivalue;
pub mod validation;
pub mod instance;
pub mod abi;
pub mod runtime;

pub use error::RuntimeError;
pub use config::RuntimeConfig;
pub use runtime::Runtime;

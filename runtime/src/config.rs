//! Runtime configuration.

use std::net::{IpAddr, Ipv4Addr};

/// Configuration for the host runtime.
///
/// Controls engine-level settings and the downstream connection facts the
/// ABI reports to the guest.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Use the wasmtime on-disk code cache so repeated loads of the same
    /// guest skip recompilation. Failure to open the cache is non-fatal.
    pub enable_cache: bool,

    /// Address reported by `downstream_client_ip_addr` and described by the
    /// built-in geolocation backend.
    pub client_addr: IpAddr,

    /// Whether the downstream connection carried TLS; selects the `https`
    /// scheme on the downstream request URL.
    pub tls: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            enable_cache: false,
            client_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            tls: false,
        }
    }
}

//! The host-call surface imported by the guest.
//!
//! Host functions are grouped the way the guest imports them: the
//! `fastly_abi` / `fastly_uap` / `fastly_http_req` / `fastly_http_resp` /
//! `fastly_http_body` / `fastly_log` / `fastly_dictionary` namespaces, plus
//! the legacy `env` module whose `xqd_`-prefixed names alias the same
//! implementations. Each function:
//!
//! 1. Extracts the guest memory from the `Caller`
//! 2. Validates input handles against the per-instance tables
//! 3. Reads caller-provided byte regions from guest memory
//! 4. Performs the operation
//! 5. Writes outputs back and returns an `XqdStatus` as i32
//!
//! Not-yet-implemented endpoints are linked as stubs that log their
//! arguments and return OK, keeping guests linkable.

pub mod request;
pub mod response;
pub mod body;
pub mod misc;
mod stubs;

use wasmtime::{Caller, Linker, Memory};

use crate::error::RuntimeError;
use crate::instance::GuestCtx;

/// Get the guest's exported memory from a Caller.
pub(crate) fn memory_of(caller: &mut Caller<'_, GuestCtx>) -> Option<Memory> {
    caller.get_export("memory").and_then(|e| e.into_memory())
}

/// Register the full ABI surface with the linker.
pub fn register_abi(linker: &mut Linker<GuestCtx>) -> Result<(), RuntimeError> {
    linker.func_wrap("fastly_abi", "init", misc::abi_init)?;
    linker.func_wrap("fastly_uap", "parse", misc::uap_parse)?;

    linker.func_wrap("fastly_http_req", "new", request::req_new)?;
    linker.func_wrap("fastly_http_req", "version_get", request::req_version_get)?;
    linker.func_wrap("fastly_http_req", "version_set", request::req_version_set)?;
    linker.func_wrap("fastly_http_req", "method_get", request::req_method_get)?;
    linker.func_wrap("fastly_http_req", "method_set", request::req_method_set)?;
    linker.func_wrap("fastly_http_req", "uri_get", request::req_uri_get)?;
    linker.func_wrap("fastly_http_req", "uri_set", request::req_uri_set)?;
    linker.func_wrap("fastly_http_req", "header_names_get", request::req_header_names_get)?;
    linker.func_wrap("fastly_http_req", "header_value_get", request::req_header_value_get)?;
    linker.func_wrap("fastly_http_req", "header_values_get", request::req_header_values_get)?;
    linker.func_wrap("fastly_http_req", "header_values_set", request::req_header_values_set)?;
    linker.func_wrap("fastly_http_req", "header_insert", request::req_header_insert)?;
    linker.func_wrap("fastly_http_req", "header_append", request::req_header_append)?;
    linker.func_wrap("fastly_http_req", "header_remove", request::req_header_remove)?;
    // The original header order is not tracked separately; enumeration is
    // canonical sorted order either way.
    linker.func_wrap(
        "fastly_http_req",
        "original_header_names_get",
        request::req_header_names_get,
    )?;
    linker.func_wrap(
        "fastly_http_req",
        "original_header_count",
        request::req_original_header_count,
    )?;
    linker.func_wrap("fastly_http_req", "cache_override_set", request::req_cache_override_set)?;
    linker.func_wrap(
        "fastly_http_req",
        "cache_override_v2_set",
        request::req_cache_override_v2_set,
    )?;
    linker.func_wrap(
        "fastly_http_req",
        "body_downstream_get",
        request::req_body_downstream_get,
    )?;
    linker.func_wrap(
        "fastly_http_req",
        "downstream_client_ip_addr",
        request::req_downstream_client_ip_addr,
    )?;
    linker.func_wrap("fastly_http_req", "send", request::req_send)?;

    linker.func_wrap("fastly_http_resp", "new", response::resp_new)?;
    linker.func_wrap("fastly_http_resp", "status_get", response::resp_status_get)?;
    linker.func_wrap("fastly_http_resp", "status_set", response::resp_status_set)?;
    linker.func_wrap("fastly_http_resp", "version_get", response::resp_version_get)?;
    linker.func_wrap("fastly_http_resp", "version_set", response::resp_version_set)?;
    linker.func_wrap("fastly_http_resp", "header_names_get", response::resp_header_names_get)?;
    linker.func_wrap("fastly_http_resp", "header_value_get", response::resp_header_value_get)?;
    linker.func_wrap("fastly_http_resp", "header_values_get", response::resp_header_values_get)?;
    linker.func_wrap("fastly_http_resp", "header_values_set", response::resp_header_values_set)?;
    linker.func_wrap("fastly_http_resp", "header_insert", response::resp_header_insert)?;
    linker.func_wrap("fastly_http_resp", "header_append", response::resp_header_append)?;
    linker.func_wrap("fastly_http_resp", "header_remove", response::resp_header_remove)?;
    linker.func_wrap("fastly_http_resp", "send_downstream", response::resp_send_downstream)?;

    linker.func_wrap("fastly_http_body", "new", body::body_new)?;
    linker.func_wrap("fastly_http_body", "read", body::body_read)?;
    linker.func_wrap("fastly_http_body", "write", body::body_write)?;
    linker.func_wrap("fastly_http_body", "append", body::body_append)?;
    linker.func_wrap("fastly_http_body", "close", body::body_close)?;

    register_env_aliases(linker)?;
    stubs::register_stubs(linker)?;

    Ok(())
}

/// The legacy `env` module: the same implementations under `xqd_` names, for
/// guests built before the ABI moved to per-namespace imports.
fn register_env_aliases(linker: &mut Linker<GuestCtx>) -> Result<(), RuntimeError> {
    linker.func_wrap("env", "xqd_init", misc::abi_init)?;
    linker.func_wrap("env", "xqd_uap_parse", misc::uap_parse)?;

    linker.func_wrap("env", "xqd_req_new", request::req_new)?;
    linker.func_wrap("env", "xqd_req_version_get", request::req_version_get)?;
    linker.func_wrap("env", "xqd_req_version_set", request::req_version_set)?;
    linker.func_wrap("env", "xqd_req_method_get", request::req_method_get)?;
    linker.func_wrap("env", "xqd_req_method_set", request::req_method_set)?;
    linker.func_wrap("env", "xqd_req_uri_get", request::req_uri_get)?;
    linker.func_wrap("env", "xqd_req_uri_set", request::req_uri_set)?;
    linker.func_wrap("env", "xqd_req_header_names_get", request::req_header_names_get)?;
    linker.func_wrap("env", "xqd_req_header_values_get", request::req_header_values_get)?;
    linker.func_wrap("env", "xqd_req_header_values_set", request::req_header_values_set)?;
    linker.func_wrap("env", "xqd_req_header_insert", request::req_header_insert)?;
    linker.func_wrap(
        "env",
        "xqd_req_original_header_names_get",
        request::req_header_names_get,
    )?;
    linker.func_wrap("env", "xqd_req_cache_override_set", request::req_cache_override_set)?;
    linker.func_wrap(
        "env",
        "xqd_req_body_downstream_get",
        request::req_body_downstream_get,
    )?;
    linker.func_wrap(
        "env",
        "xqd_req_downstream_client_ip_addr",
        request::req_downstream_client_ip_addr,
    )?;
    linker.func_wrap("env", "xqd_req_send", request::req_send)?;

    linker.func_wrap("env", "xqd_resp_new", response::resp_new)?;
    linker.func_wrap("env", "xqd_resp_status_get", response::resp_status_get)?;
    linker.func_wrap("env", "xqd_resp_status_set", response::resp_status_set)?;
    linker.func_wrap("env", "xqd_resp_version_get", response::resp_version_get)?;
    linker.func_wrap("env", "xqd_resp_version_set", response::resp_version_set)?;
    linker.func_wrap("env", "xqd_resp_header_names_get", response::resp_header_names_get)?;
    linker.func_wrap("env", "xqd_resp_header_value_get", response::resp_header_value_get)?;
    linker.func_wrap("env", "xqd_resp_header_values_get", response::resp_header_values_get)?;
    linker.func_wrap("env", "xqd_resp_header_values_set", response::resp_header_values_set)?;
    linker.func_wrap("env", "xqd_resp_header_insert", response::resp_header_insert)?;
    linker.func_wrap("env", "xqd_resp_header_append", response::resp_header_append)?;
    linker.func_wrap("env", "xqd_resp_send_downstream", response::resp_send_downstream)?;

    linker.func_wrap("env", "xqd_body_new", body::body_new)?;
    linker.func_wrap("env", "xqd_body_write", body::body_write)?;
    linker.func_wrap("env", "xqd_body_read", body::body_read)?;
    linker.func_wrap("env", "xqd_body_append", body::body_append)?;
    linker.func_wrap("env", "xqd_body_close_downstream", body::body_close)?;

    Ok(())
}

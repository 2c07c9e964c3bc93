//! Stubbed ABI endpoints.
//!
//! These keep guests linkable while individual verbs are unimplemented: each
//! logs its arguments and returns OK. As endpoints gain real
//! implementations they move out of here and into their namespace module.

use wasmtime::Linker;

use crate::error::RuntimeError;
use crate::instance::GuestCtx;

macro_rules! stub {
    ($linker:expr, $module:literal, $name:literal, [$($arg:ident),*]) => {
        $linker.func_wrap($module, $name, |$($arg: i32),*| -> i32 {
            let args: &[i32] = &[$($arg),*];
            tracing::debug!(module = $module, name = $name, ?args, "stub host call");
            0
        })?
    };
}

pub(crate) fn register_stubs(linker: &mut Linker<GuestCtx>) -> Result<(), RuntimeError> {
    stub!(linker, "fastly_log", "endpoint_get", [a, b, c]);
    stub!(linker, "fastly_log", "write", [a, b, c, d]);

    stub!(linker, "fastly_dictionary", "open", [a, b, c]);
    stub!(linker, "fastly_dictionary", "get", [a, b, c, d, e, f]);

    stub!(linker, "fastly_http_req", "pending_req_poll", [a, b, c, d]);
    stub!(linker, "fastly_http_req", "pending_req_select", [a, b, c, d, e]);
    stub!(linker, "fastly_http_req", "pending_req_wait", [a, b, c]);
    stub!(linker, "fastly_http_req", "send_async", [a, b, c, d, e]);
    stub!(linker, "fastly_http_req", "downstream_tls_cipher_openssl_name", [a, b, c]);
    stub!(linker, "fastly_http_req", "downstream_tls_protocol", [a, b, c]);
    stub!(linker, "fastly_http_req", "downstream_tls_client_hello", [a, b, c]);

    stub!(linker, "env", "xqd_log_endpoint_get", [a, b, c]);
    stub!(linker, "env", "xqd_log_write", [a, b, c, d]);
    stub!(linker, "env", "xqd_pending_req_poll", [a, b, c, d]);
    stub!(linker, "env", "xqd_pending_req_select", [a, b, c, d, e]);
    stub!(linker, "env", "xqd_pending_req_wait", [a, b, c]);
    stub!(linker, "env", "xqd_req_send_async", [a, b, c, d, e]);
    stub!(linker, "env", "xqd_req_downstream_tls_cipher_openssl_name", [a, b, c]);
    stub!(linker, "env", "xqd_req_downstream_tls_protocol", [a, b, c]);
    stub!(linker, "env", "xqd_req_downstream_tls_client_hello", [a, b, c]);

    Ok(())
}

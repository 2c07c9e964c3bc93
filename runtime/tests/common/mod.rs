//! Shared test helpers for integration tests.
//!
//! Provides WAT guest programs and request builders used across the
//! integration test files. The guests use a fixed scratch layout in linear
//! memory:
//!
//! ```text
//! 0..16    handle out-cells (request, body, response, response body)
//! 16..48   multi-value cursor cells (i64 ending cursor, u32 nwritten) x2
//! 48..52   body_write nwritten cell
//! 256..    status-code scratch the guest copies into its response body
//! 512..    data segments (strings baked into the guest)
//! 1024..   read buffers
//! ```

#![allow(dead_code)]

use http::{Request, Response};

use fastlike_runtime::{Runtime, RuntimeConfig};

/// Echoes the downstream request body back with status 200.
pub const ECHO_GUEST: &str = r#"
    (module
        (import "fastly_http_req" "body_downstream_get"
            (func $downstream_get (param i32 i32) (result i32)))
        (import "fastly_http_body" "read"
            (func $body_read (param i32 i32 i32 i32) (result i32)))
        (import "fastly_http_body" "write"
            (func $body_write (param i32 i32 i32 i32 i32) (result i32)))
        (import "fastly_http_body" "new"
            (func $body_new (param i32) (result i32)))
        (import "fastly_http_resp" "new"
            (func $resp_new (param i32) (result i32)))
        (import "fastly_http_resp" "status_set"
            (func $status_set (param i32 i32) (result i32)))
        (import "fastly_http_resp" "send_downstream"
            (func $send_downstream (param i32 i32 i32) (result i32)))
        (memory (export "memory") 1)
        (func (export "_start")
            (drop (call $downstream_get (i32.const 0) (i32.const 4)))
            (drop (call $body_read
                (i32.load (i32.const 4))
                (i32.const 1024) (i32.const 4096) (i32.const 24)))
            (drop (call $resp_new (i32.const 8)))
            (drop (call $status_set (i32.load (i32.const 8)) (i32.const 200)))
            (drop (call $body_new (i32.const 12)))
            (drop (call $body_write
                (i32.load (i32.const 12))
                (i32.const 1024) (i32.load (i32.const 24))
                (i32.const 0) (i32.const 48)))
            (drop (call $send_downstream
                (i32.load (i32.const 8)) (i32.load (i32.const 12)) (i32.const 0)))
        )
    )
"#;

/// Enumerates downstream header names and the values of `X-A`, copies the
/// values onto the response headers, and echoes both raw buffers as the
/// response body.
pub const HEADERS_GUEST: &str = r#"
    (module
        (import "fastly_http_req" "body_downstream_get"
            (func $downstream_get (param i32 i32) (result i32)))
        (import "fastly_http_req" "header_names_get"
            (func $names_get (param i32 i32 i32 i32 i32 i32) (result i32)))
        (import "fastly_http_req" "header_values_get"
            (func $values_get (param i32 i32 i32 i32 i32 i32 i32 i32) (result i32)))
        (import "fastly_http_resp" "header_values_set"
            (func $values_set (param i32 i32 i32 i32 i32) (result i32)))
        (import "fastly_http_body" "write"
            (func $body_write (param i32 i32 i32 i32 i32) (result i32)))
        (import "fastly_http_body" "new"
            (func $body_new (param i32) (result i32)))
        (import "fastly_http_resp" "new"
            (func $resp_new (param i32) (result i32)))
        (import "fastly_http_resp" "send_downstream"
            (func $send_downstream (param i32 i32 i32) (result i32)))
        (memory (export "memory") 1)
        (data (i32.const 512) "X-A")
        (func (export "_start")
            (drop (call $downstream_get (i32.const 0) (i32.const 4)))
            (drop (call $names_get
                (i32.load (i32.const 0))
                (i32.const 1024) (i32.const 256)
                (i32.const 0) (i32.const 16) (i32.const 24)))
            (drop (call $values_get
                (i32.load (i32.const 0))
                (i32.const 512) (i32.const 3)
                (i32.const 2048) (i32.const 256)
                (i32.const 0) (i32.const 32) (i32.const 40)))
            (drop (call $resp_new (i32.const 8)))
            (drop (call $values_set
                (i32.load (i32.const 8))
                (i32.const 512) (i32.const 3)
                (i32.const 2048) (i32.load (i32.const 40))))
            (drop (call $body_new (i32.const 12)))
            (drop (call $body_write
                (i32.load (i32.const 12))
                (i32.const 1024) (i32.load (i32.const 24))
                (i32.const 0) (i32.const 48)))
            (drop (call $body_write
                (i32.load (i32.const 12))
                (i32.const 2048) (i32.load (i32.const 40))
                (i32.const 0) (i32.const 48)))
            (drop (call $send_downstream
                (i32.load (i32.const 8)) (i32.load (i32.const 12)) (i32.const 0)))
        )
    )
"#;

/// Exercises the documented error codes and stores them into the response
/// body: invalid method, invalid URI, unsupported version, version after the
/// failed set, unknown handle. Five little-endian i32s.
pub const CODES_GUEST: &str = r#"
    (module
        (import "fastly_http_req" "new"
            (func $req_new (param i32) (result i32)))
        (import "fastly_http_req" "method_set"
            (func $method_set (param i32 i32 i32) (result i32)))
        (import "fastly_http_req" "uri_set"
            (func $uri_set (param i32 i32 i32) (result i32)))
        (import "fastly_http_req" "version_set"
            (func $version_set (param i32 i32) (result i32)))
        (import "fastly_http_req" "version_get"
            (func $version_get (param i32 i32) (result i32)))
        (import "fastly_http_req" "method_get"
            (func $method_get (param i32 i32 i32 i32) (result i32)))
        (import "fastly_http_body" "write"
            (func $body_write (param i32 i32 i32 i32 i32) (result i32)))
        (import "fastly_http_body" "new"
            (func $body_new (param i32) (result i32)))
        (import "fastly_http_resp" "new"
            (func $resp_new (param i32) (result i32)))
        (import "fastly_http_resp" "send_downstream"
            (func $send_downstream (param i32 i32 i32) (result i32)))
        (memory (export "memory") 1)
        (data (i32.const 512) "BREW")
        (data (i32.const 520) "::not a url::")
        (func (export "_start")
            (drop (call $req_new (i32.const 0)))
            (i32.store (i32.const 256)
                (call $method_set (i32.load (i32.const 0)) (i32.const 512) (i32.const 4)))
            (i32.store (i32.const 260)
                (call $uri_set (i32.load (i32.const 0)) (i32.const 520) (i32.const 13)))
            (i32.store (i32.const 264)
                (call $version_set (i32.load (i32.const 0)) (i32.const 3)))
            (drop (call $version_get (i32.load (i32.const 0)) (i32.const 268)))
            (i32.store (i32.const 272)
                (call $method_get (i32.const 99) (i32.const 1024) (i32.const 16) (i32.const 24)))
            (drop (call $resp_new (i32.const 8)))
            (drop (call $body_new (i32.const 12)))
            (drop (call $body_write
                (i32.load (i32.const 12))
                (i32.const 256) (i32.const 20)
                (i32.const 0) (i32.const 48)))
            (drop (call $send_downstream
                (i32.load (i32.const 8)) (i32.load (i32.const 12)) (i32.const 0)))
        )
    )
"#;

/// Writes into two buffer bodies, appends the second onto the first, and
/// sends the concatenation downstream.
pub const APPEND_GUEST: &str = r#"
    (module
        (import "fastly_http_body" "new"
            (func $body_new (param i32) (result i32)))
        (import "fastly_http_body" "write"
            (func $body_write (param i32 i32 i32 i32 i32) (result i32)))
        (import "fastly_http_body" "append"
            (func $body_append (param i32 i32) (result i32)))
        (import "fastly_http_resp" "new"
            (func $resp_new (param i32) (result i32)))
        (import "fastly_http_resp" "send_downstream"
            (func $send_downstream (param i32 i32 i32) (result i32)))
        (memory (export "memory") 1)
        (data (i32.const 512) "foo-")
        (data (i32.const 520) "bar")
        (func (export "_start")
            (drop (call $body_new (i32.const 0)))
            (drop (call $body_new (i32.const 4)))
            (drop (call $body_write
                (i32.load (i32.const 0)) (i32.const 512) (i32.const 4)
                (i32.const 0) (i32.const 48)))
            (drop (call $body_write
                (i32.load (i32.const 4)) (i32.const 520) (i32.const 3)
                (i32.const 0) (i32.const 48)))
            (drop (call $body_append (i32.load (i32.const 0)) (i32.load (i32.const 4))))
            (drop (call $resp_new (i32.const 8)))
            (drop (call $send_downstream
                (i32.load (i32.const 8)) (i32.load (i32.const 0)) (i32.const 0)))
        )
    )
"#;

/// A guest that traps immediately; it must never run for looped requests.
pub const TRAP_GUEST: &str = r#"
    (module
        (memory (export "memory") 1)
        (func (export "_start") unreachable)
    )
"#;

/// Build a guest that issues a GET to `https://example/` on the named
/// backend and proxies the backend response straight downstream.
pub fn proxy_guest(backend: &str) -> String {
    format!(
        r#"
        (module
            (import "fastly_http_req" "new"
                (func $req_new (param i32) (result i32)))
            (import "fastly_http_req" "method_set"
                (func $method_set (param i32 i32 i32) (result i32)))
            (import "fastly_http_req" "uri_set"
                (func $uri_set (param i32 i32 i32) (result i32)))
            (import "fastly_http_req" "send"
                (func $send (param i32 i32 i32 i32 i32 i32) (result i32)))
            (import "fastly_http_body" "new"
                (func $body_new (param i32) (result i32)))
            (import "fastly_http_resp" "send_downstream"
                (func $send_downstream (param i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (data (i32.const 512) "GET")
            (data (i32.const 520) "https://example/")
            (data (i32.const 560) "{backend}")
            (func (export "_start")
                (drop (call $req_new (i32.const 0)))
                (drop (call $method_set
                    (i32.load (i32.const 0)) (i32.const 512) (i32.const 3)))
                (drop (call $uri_set
                    (i32.load (i32.const 0)) (i32.const 520) (i32.const 16)))
                (drop (call $body_new (i32.const 4)))
                (drop (call $send
                    (i32.load (i32.const 0)) (i32.load (i32.const 4))
                    (i32.const 560) (i32.const {backend_len})
                    (i32.const 8) (i32.const 12)))
                (drop (call $send_downstream
                    (i32.load (i32.const 8)) (i32.load (i32.const 12)) (i32.const 0)))
            )
        )
        "#,
        backend = backend,
        backend_len = backend.len(),
    )
}

/// Like [`proxy_guest`], but writes `ping` into the request body before
/// sending it.
pub fn proxy_guest_with_body(backend: &str) -> String {
    format!(
        r#"
        (module
            (import "fastly_http_req" "new"
                (func $req_new (param i32) (result i32)))
            (import "fastly_http_req" "method_set"
                (func $method_set (param i32 i32 i32) (result i32)))
            (import "fastly_http_req" "uri_set"
                (func $uri_set (param i32 i32 i32) (result i32)))
            (import "fastly_http_req" "send"
                (func $send (param i32 i32 i32 i32 i32 i32) (result i32)))
            (import "fastly_http_body" "new"
                (func $body_new (param i32) (result i32)))
            (import "fastly_http_body" "write"
                (func $body_write (param i32 i32 i32 i32 i32) (result i32)))
            (import "fastly_http_resp" "send_downstream"
                (func $send_downstream (param i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (data (i32.const 512) "POST")
            (data (i32.const 520) "https://example/")
            (data (i32.const 540) "ping")
            (data (i32.const 560) "{backend}")
            (func (export "_start")
                (drop (call $req_new (i32.const 0)))
                (drop (call $method_set
                    (i32.load (i32.const 0)) (i32.const 512) (i32.const 4)))
                (drop (call $uri_set
                    (i32.load (i32.const 0)) (i32.const 520) (i32.const 16)))
                (drop (call $body_new (i32.const 4)))
                (drop (call $body_write
                    (i32.load (i32.const 4)) (i32.const 540) (i32.const 4)
                    (i32.const 0) (i32.const 48)))
                (drop (call $send
                    (i32.load (i32.const 0)) (i32.load (i32.const 4))
                    (i32.const 560) (i32.const {backend_len})
                    (i32.const 8) (i32.const 12)))
                (drop (call $send_downstream
                    (i32.load (i32.const 8)) (i32.load (i32.const 12)) (i32.const 0)))
            )
        )
        "#,
        backend = backend,
        backend_len = backend.len(),
    )
}

// ── Runtime and request builders ──

pub fn load_runtime(wat: &str) -> Runtime {
    Runtime::new(wat.as_bytes(), RuntimeConfig::default()).expect("failed to load guest")
}

pub fn get(path: &str) -> Request<Vec<u8>> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Vec::new())
        .unwrap()
}

pub fn post(path: &str, body: &[u8]) -> Request<Vec<u8>> {
    Request::builder()
        .method("POST")
        .uri(path)
        .body(body.to_vec())
        .unwrap()
}

pub fn body_string(resp: &Response<Vec<u8>>) -> String {
    String::from_utf8_lossy(resp.body()).into_owned()
}

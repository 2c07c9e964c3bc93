//! End-to-end tests for the full pipeline:
//! downstream request → instance → WAT guest → host calls → downstream
//! response.

mod common;

use http::{Request, StatusCode};

use common::*;

// ── Echo ──

#[test]
fn test_echo_guest_roundtrips_body() {
    let runtime = load_runtime(ECHO_GUEST);
    let resp = runtime.serve(post("/", b"foo=bar"));

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body(), b"foo=bar");
}

#[test]
fn test_echo_guest_with_empty_body() {
    let runtime = load_runtime(ECHO_GUEST);
    let resp = runtime.serve(post("/", b""));

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.body().is_empty());
}

// ── Header pass-through ──

#[test]
fn test_header_enumeration_and_passthrough() {
    let runtime = load_runtime(HEADERS_GUEST);
    let req = Request::builder()
        .method("GET")
        .uri("/")
        .header("x-a", "1")
        .header("x-a", "2")
        .header("x-b", "3")
        .body(Vec::new())
        .unwrap();

    let resp = runtime.serve(req);
    assert_eq!(resp.status(), StatusCode::OK);

    // Canonical sorted names, then the sorted values of X-A, each
    // NUL-terminated exactly as the guest saw them in its buffers.
    assert_eq!(resp.body(), b"X-A\x00X-B\x001\x002\x00");

    // The guest copied the X-A values onto its response verbatim.
    let values: Vec<&str> = resp
        .headers()
        .get_all("x-a")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(values, vec!["1", "2"]);
}

// ── Backend dispatch ──

#[test]
fn test_send_reaches_installed_backend() {
    use fastlike_hostapi::{backend::bad_gateway, Handler};
    use http::Response;
    use std::sync::Arc;

    let resolver = |name: &str| -> Handler {
        if name == "origin" {
            Box::new(|_req| {
                let mut resp = Response::new(Vec::new());
                *resp.status_mut() = StatusCode::NO_CONTENT;
                resp
            })
        } else {
            bad_gateway()
        }
    };

    let runtime = load_runtime(&proxy_guest("origin")).with_backends(Arc::new(resolver));
    let resp = runtime.serve(get("/"));
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[test]
fn test_unknown_backend_is_bad_gateway() {
    let runtime = load_runtime(&proxy_guest("unknown"));
    let resp = runtime.serve(get("/"));
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert!(resp.body().is_empty());
}

// ── Loop detection ──

#[test]
fn test_looped_request_is_refused_before_the_guest_runs() {
    // TRAP_GUEST faults if invoked at all, so a 508 proves the guest never
    // started.
    let runtime = load_runtime(TRAP_GUEST);
    let req = Request::builder()
        .uri("/")
        .header("cdn-loop", "fastlike, other")
        .body(Vec::new())
        .unwrap();

    let resp = runtime.serve(req);
    assert_eq!(resp.status(), StatusCode::LOOP_DETECTED);
    assert!(body_string(&resp).contains("Loop detected"));
}

#[test]
fn test_loop_match_is_case_insensitive() {
    let runtime = load_runtime(TRAP_GUEST);
    let req = Request::builder()
        .uri("/")
        .header("cdn-loop", "FastLike")
        .body(Vec::new())
        .unwrap();

    assert_eq!(runtime.serve(req).status(), StatusCode::LOOP_DETECTED);
}

// ── Faults ──

#[test]
fn test_guest_trap_becomes_500_with_diagnostic() {
    let runtime = load_runtime(TRAP_GUEST);
    let resp = runtime.serve(get("/"));

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(&resp).contains("Error running the guest program"));
}

// ── Documented error codes ──

#[test]
fn test_abi_error_codes_observed_by_guest() {
    let runtime = load_runtime(CODES_GUEST);
    let resp = runtime.serve(get("/"));
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.body();
    assert_eq!(body.len(), 20);
    let codes: Vec<i32> = body
        .chunks(4)
        .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
        .collect();

    // method_set("BREW") → HttpParse
    assert_eq!(codes[0], 7);
    // uri_set("::not a url::") → HttpParse
    assert_eq!(codes[1], 7);
    // version_set(HTTP/2) → Unsupported
    assert_eq!(codes[2], 5);
    // version_get still reports HTTP/1.1
    assert_eq!(codes[3], 2);
    // method_get on an unissued handle → InvalidHandle
    assert_eq!(codes[4], 3);
}

// ── Body append ──

#[test]
fn test_body_append_concatenates_downstream() {
    let runtime = load_runtime(APPEND_GUEST);
    let resp = runtime.serve(get("/"));

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body(), b"foo-bar");
}

// ── Instance isolation ──

#[test]
fn test_instances_share_no_state_across_requests() {
    let runtime = load_runtime(ECHO_GUEST);

    let first = runtime.serve(post("/", b"first"));
    let second = runtime.serve(post("/", b"second"));

    assert_eq!(first.body(), b"first");
    assert_eq!(second.body(), b"second");
}

//! `fastly_http_req` — request handles, the downstream request, and
//! sub-request dispatch.

use std::net::IpAddr;

use http::header::{HeaderValue, CONTENT_LENGTH};
use http::Request;
use url::Url;
use wasmtime::Caller;

use fastlike_hostapi::backend::geolocation;
use fastlike_hostapi::{HeaderMultimap, HttpVersion, RequestHandle, ResponseHandle, XqdStatus};

use crate::instance::{GuestCtx, CDN_LOOP_TOKEN};
use crate::memory;
use crate::multivalue::write_multivalue;

/// The canonical method set accepted by `method_set`.
const METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

pub(crate) fn req_new(mut caller: Caller<'_, GuestCtx>, handle_out: i32) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let id = caller.data_mut().requests.new_handle();
    tracing::debug!(handle = id, "req_new");

    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, handle_out, id as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_version_get(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    version_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    if caller.data().requests.get(handle).is_none() {
        tracing::debug!(handle, "req_version_get: invalid handle");
        return XqdStatus::InvalidHandle.as_i32();
    }

    tracing::debug!(handle, version = HttpVersion::Http11.as_i32(), "req_version_get");
    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, version_out, HttpVersion::Http11.as_i32() as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_version_set(caller: Caller<'_, GuestCtx>, handle: i32, version: i32) -> i32 {
    tracing::debug!(handle, version, "req_version_set");

    if caller.data().requests.get(handle).is_none() {
        return XqdStatus::InvalidHandle.as_i32();
    }

    if HttpVersion::from_i32(version) != Some(HttpVersion::Http11) {
        tracing::debug!(handle, version, "req_version_set: unsupported version");
        return XqdStatus::Unsupported.as_i32();
    }

    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_method_get(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    addr: i32,
    maxlen: i32,
    nwritten_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let method = match caller.data().requests.get(handle) {
        Some(r) => r.method.as_str().to_string(),
        None => {
            tracing::debug!(handle, "req_method_get: invalid handle");
            return XqdStatus::InvalidHandle.as_i32();
        }
    };

    if maxlen < 0 || method.len() > maxlen as usize {
        return XqdStatus::BufferLength.as_i32();
    }

    tracing::debug!(handle, method = %method, "req_method_get");

    let data = mem.data_mut(&mut caller);
    let nwritten = match memory::write_bytes(data, addr, method.as_bytes()) {
        Ok(n) => n,
        Err(e) => return e.to_i32(),
    };
    if memory::put_u32(data, nwritten_out, nwritten as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_method_set(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    addr: i32,
    size: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let method = {
        let data = mem.data(&caller);
        match memory::read_string(data, addr, size) {
            Ok(s) => s.to_ascii_uppercase(),
            Err(e) => return e.to_i32(),
        }
    };

    let r = match caller.data_mut().requests.get_mut(handle) {
        Some(r) => r,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    if !METHODS.contains(&method.as_str()) {
        tracing::debug!(handle, method = %method, "req_method_set: invalid method");
        return XqdStatus::HttpParse.as_i32();
    }

    tracing::debug!(handle, method = %method, "req_method_set");
    r.method = match http::Method::from_bytes(method.as_bytes()) {
        Ok(m) => m,
        Err(_) => return XqdStatus::HttpParse.as_i32(),
    };
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_uri_get(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    addr: i32,
    maxlen: i32,
    nwritten_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let uri = match caller.data().requests.get(handle) {
        Some(r) => r.url.as_ref().map(Url::to_string).unwrap_or_default(),
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    if maxlen < 0 || uri.len() > maxlen as usize {
        return XqdStatus::BufferLength.as_i32();
    }

    tracing::debug!(handle, uri = %uri, "req_uri_get");

    let data = mem.data_mut(&mut caller);
    let nwritten = match memory::write_bytes(data, addr, uri.as_bytes()) {
        Ok(n) => n,
        Err(e) => return e.to_i32(),
    };
    if memory::put_u32(data, nwritten_out, nwritten as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_uri_set(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    addr: i32,
    size: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let uri = {
        let data = mem.data(&caller);
        match memory::read_string(data, addr, size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        }
    };

    let r = match caller.data_mut().requests.get_mut(handle) {
        Some(r) => r,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    let url = match Url::parse(&uri) {
        Ok(u) => u,
        Err(e) => {
            tracing::debug!(handle, uri = %uri, error = %e, "req_uri_set: parse error");
            return XqdStatus::HttpParse.as_i32();
        }
    };

    tracing::debug!(handle, uri = %url, "req_uri_set");
    r.url = Some(url);
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_header_names_get(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    addr: i32,
    maxlen: i32,
    cursor: i32,
    ending_cursor_out: i32,
    nwritten_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    tracing::debug!(handle, cursor, "req_header_names_get");

    // Canonical names come out of the multimap already sorted.
    let names: Vec<String> = match caller.data().requests.get(handle) {
        Some(r) => r.headers.names().map(str::to_string).collect(),
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    let data = mem.data_mut(&mut caller);
    write_multivalue(data, &names, addr, maxlen, cursor, ending_cursor_out, nwritten_out)
}

pub(crate) fn req_header_value_get(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    name_addr: i32,
    name_size: i32,
    addr: i32,
    maxlen: i32,
    nwritten_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let name = {
        let data = mem.data(&caller);
        match memory::read_string(data, name_addr, name_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        }
    };

    let value = match caller.data().requests.get(handle) {
        Some(r) => r.headers.first(&name).map(str::to_string),
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, "req_header_value_get");

    let value = match value {
        Some(v) => v,
        None => return XqdStatus::InvalidArgument.as_i32(),
    };

    if maxlen < 0 || value.len() > maxlen as usize {
        return XqdStatus::BufferLength.as_i32();
    }

    let data = mem.data_mut(&mut caller);
    let nwritten = match memory::write_bytes(data, addr, value.as_bytes()) {
        Ok(n) => n,
        Err(e) => return e.to_i32(),
    };
    if memory::put_u32(data, nwritten_out, nwritten as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_header_values_get(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    name_addr: i32,
    name_size: i32,
    addr: i32,
    maxlen: i32,
    cursor: i32,
    ending_cursor_out: i32,
    nwritten_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let name = {
        let data = mem.data(&caller);
        match memory::read_string(data, name_addr, name_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        }
    };

    tracing::debug!(handle, header = %name, cursor, "req_header_values_get");

    // Values are sorted per call so cursor progress is deterministic.
    let mut values: Vec<String> = match caller.data().requests.get(handle) {
        Some(r) => r.headers.values(&name).to_vec(),
        None => return XqdStatus::InvalidHandle.as_i32(),
    };
    values.sort();

    let data = mem.data_mut(&mut caller);
    write_multivalue(data, &values, addr, maxlen, cursor, ending_cursor_out, nwritten_out)
}

/// Read a NUL-separated, NUL-terminated value list from guest memory.
pub(crate) fn read_value_list(data: &[u8], addr: i32, size: i32) -> Result<Vec<String>, i32> {
    if size <= 0 {
        return Err(XqdStatus::InvalidArgument.as_i32());
    }
    let buf = memory::read_bytes(data, addr, size).map_err(|e| e.to_i32())?;
    if buf.last() != Some(&0) {
        return Err(XqdStatus::InvalidArgument.as_i32());
    }
    buf[..buf.len() - 1]
        .split(|b| *b == 0)
        .map(|chunk| {
            String::from_utf8(chunk.to_vec())
                .map_err(|_| XqdStatus::InvalidArgument.as_i32())
        })
        .collect()
}

pub(crate) fn req_header_values_set(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    name_addr: i32,
    name_size: i32,
    values_addr: i32,
    values_size: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let (name, values) = {
        let data = mem.data(&caller);
        let name = match memory::read_string(data, name_addr, name_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        };
        let values = match read_value_list(data, values_addr, values_size) {
            Ok(v) => v,
            Err(code) => return code,
        };
        (name, values)
    };

    let r = match caller.data_mut().requests.get_mut(handle) {
        Some(r) => r,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, values = ?values, "req_header_values_set");
    r.headers.set(&name, values);
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_header_insert(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    name_addr: i32,
    name_size: i32,
    value_addr: i32,
    value_size: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let (name, value) = {
        let data = mem.data(&caller);
        let name = match memory::read_string(data, name_addr, name_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        };
        let value = match memory::read_string(data, value_addr, value_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        };
        (name, value)
    };

    let r = match caller.data_mut().requests.get_mut(handle) {
        Some(r) => r,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, value = %value, "req_header_insert");
    r.headers.insert(&name, value);
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_header_append(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    name_addr: i32,
    name_size: i32,
    value_addr: i32,
    value_size: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let (name, value) = {
        let data = mem.data(&caller);
        let name = match memory::read_string(data, name_addr, name_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        };
        let value = match memory::read_string(data, value_addr, value_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        };
        (name, value)
    };

    let r = match caller.data_mut().requests.get_mut(handle) {
        Some(r) => r,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, value = %value, "req_header_append");
    r.headers.append(&name, value);
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_header_remove(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    name_addr: i32,
    name_size: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let name = {
        let data = mem.data(&caller);
        match memory::read_string(data, name_addr, name_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        }
    };

    let r = match caller.data_mut().requests.get_mut(handle) {
        Some(r) => r,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, "req_header_remove");
    r.headers.remove(&name);
    XqdStatus::Ok.as_i32()
}

/// Name-value pair count of the downstream request as it arrived.
pub(crate) fn req_original_header_count(
    mut caller: Caller<'_, GuestCtx>,
    count_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let count = caller.data().downstream.headers.pair_count();
    tracing::debug!(count, "req_original_header_count");

    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, count_out, count as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

// There is no cache to override; both variants validate the handle and
// swallow the rest.

pub(crate) fn req_cache_override_set(
    caller: Caller<'_, GuestCtx>,
    handle: i32,
    _tag: i32,
    _ttl: i32,
    _swr: i32,
) -> i32 {
    if caller.data().requests.get(handle).is_none() {
        tracing::debug!(handle, "req_cache_override_set: invalid handle");
        return XqdStatus::InvalidHandle.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_cache_override_v2_set(
    caller: Caller<'_, GuestCtx>,
    handle: i32,
    _tag: i32,
    _ttl: i32,
    _swr: i32,
    _sk_addr: i32,
    _sk_size: i32,
) -> i32 {
    if caller.data().requests.get(handle).is_none() {
        tracing::debug!(handle, "req_cache_override_v2_set: invalid handle");
        return XqdStatus::InvalidHandle.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

/// The guest's sole entry point to the downstream request: a fresh request
/// handle carrying its method, URL, and headers, and a fresh body handle
/// wrapping its reader.
pub(crate) fn req_body_downstream_get(
    mut caller: Caller<'_, GuestCtx>,
    rh_out: i32,
    bh_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let (rid, bid) = {
        let ctx = caller.data_mut();
        let mut handle = RequestHandle::new();
        handle.method = ctx.downstream.method.clone();
        handle.url = Some(ctx.downstream.url.clone());
        handle.headers = ctx.downstream.headers.clone();
        handle.has_body = true;

        let reader = ctx.downstream.take_body();
        let rid = ctx.requests.insert(handle);
        let bid = ctx.bodies.new_reader(reader);
        (rid, bid)
    };

    tracing::debug!(request = rid, body = bid, "req_body_downstream_get");

    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, rh_out, rid as u32).is_err()
        || memory::put_u32(data, bh_out, bid as u32).is_err()
    {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn req_downstream_client_ip_addr(
    mut caller: Caller<'_, GuestCtx>,
    addr: i32,
    nwritten_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let octets: Vec<u8> = match caller.data().client_addr {
        IpAddr::V4(ip) => ip.octets().to_vec(),
        IpAddr::V6(ip) => ip.octets().to_vec(),
    };

    tracing::debug!(len = octets.len(), "req_downstream_client_ip_addr");

    let data = mem.data_mut(&mut caller);
    let nwritten = match memory::write_bytes(data, addr, &octets) {
        Ok(n) => n,
        Err(e) => return e.to_i32(),
    };
    if memory::put_u32(data, nwritten_out, nwritten as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

/// Send the request described by `(handle, body_handle)` to the named
/// backend and hand back a response handle and response body handle.
pub(crate) fn req_send(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    body_handle: i32,
    backend_addr: i32,
    backend_size: i32,
    wh_out: i32,
    bh_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let backend = {
        let data = mem.data(&caller);
        match memory::read_string(data, backend_addr, backend_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        }
    };

    // Gather everything from the handle plane before the handler runs.
    let (r, payload, size, client_addr, backends) = {
        let ctx = caller.data_mut();
        let r = match ctx.requests.get(handle) {
            Some(r) => r.clone(),
            None => {
                tracing::debug!(handle, "req_send: invalid request handle");
                return XqdStatus::InvalidHandle.as_i32();
            }
        };
        if !ctx.bodies.contains(body_handle) {
            tracing::debug!(body = body_handle, "req_send: invalid body handle");
            return XqdStatus::InvalidHandle.as_i32();
        }
        let size = match ctx.bodies.size(body_handle) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        };
        let payload = match ctx.bodies.drain(body_handle) {
            Ok(p) => p,
            Err(e) => return e.to_i32(),
        };
        (r, payload, size, ctx.client_addr, ctx.backends.clone())
    };

    let url = match r.url {
        Some(u) => u,
        None => return XqdStatus::HttpUserInvalid.as_i32(),
    };

    tracing::debug!(handle, body = body_handle, backend = %backend, uri = %url, "req_send");

    let mut headers = match r.headers.to_header_map() {
        Ok(m) => m,
        Err(e) => return e.to_i32(),
    };

    // The loop marker we check (and block) at ingress.
    headers.append("cdn-loop", HeaderValue::from_static(CDN_LOOP_TOKEN));

    // Fill in Content-Length from the body when the guest didn't provide
    // one. A never-written body has no known size and contributes nothing.
    if !headers.contains_key(CONTENT_LENGTH) && size >= 0 {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size as u64));
    }

    let uri: http::Uri = match url.as_str().parse() {
        Ok(u) => u,
        Err(_) => return XqdStatus::HttpUserInvalid.as_i32(),
    };

    let mut req = Request::new(payload);
    *req.method_mut() = r.method;
    *req.uri_mut() = uri;
    *req.headers_mut() = headers;

    // The geolocation backend is reserved and never reaches the resolver.
    let handler = if backend == "geolocation" {
        geolocation(client_addr)
    } else {
        backends.resolve(&backend)
    };

    let (parts, body) = handler(req).into_parts();

    let (wid, bid) = {
        let ctx = caller.data_mut();
        let mut wh = ResponseHandle::new();
        wh.status = parts.status;
        wh.headers = HeaderMultimap::from(&parts.headers);
        wh.has_body = true;
        let wid = ctx.responses.insert(wh);
        let bid = ctx.bodies.new_reader(Box::new(std::io::Cursor::new(body)));
        (wid, bid)
    };

    tracing::debug!(response = wid, body = bid, "req_send: backend answered");

    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, wh_out, wid as u32).is_err()
        || memory::put_u32(data, bh_out, bid as u32).is_err()
    {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

//! `fastly_http_resp` — response handles and the downstream flush.

use http::{Response, StatusCode};
use wasmtime::Caller;

use fastlike_hostapi::{HttpVersion, XqdStatus};

use crate::instance::GuestCtx;
use crate::memory;
use crate::multivalue::write_multivalue;

use super::request::read_value_list;

pub(crate) fn resp_new(mut caller: Caller<'_, GuestCtx>, handle_out: i32) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let id = caller.data_mut().responses.new_handle();
    tracing::debug!(handle = id, "resp_new");

    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, handle_out, id as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn resp_status_get(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    status_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let status = match caller.data().responses.get(handle) {
        Some(w) => w.status,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, status = status.as_u16(), "resp_status_get");

    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, status_out, u32::from(status.as_u16())).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn resp_status_set(mut caller: Caller<'_, GuestCtx>, handle: i32, status: i32) -> i32 {
    let w = match caller.data_mut().responses.get_mut(handle) {
        Some(w) => w,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    // The reason text always derives from the code, so an unknown code is
    // rejected rather than stored without one.
    let code = match u16::try_from(status).ok().and_then(|s| StatusCode::from_u16(s).ok()) {
        Some(c) => c,
        None => {
            tracing::debug!(handle, status, "resp_status_set: invalid status");
            return XqdStatus::InvalidArgument.as_i32();
        }
    };

    tracing::debug!(handle, status = code.as_u16(), "resp_status_set");
    w.status = code;
    XqdStatus::Ok.as_i32()
}

pub(crate) fn resp_version_get(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    version_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    if caller.data().responses.get(handle).is_none() {
        return XqdStatus::InvalidHandle.as_i32();
    }

    tracing::debug!(handle, version = HttpVersion::Http11.as_i32(), "resp_version_get");
    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, version_out, HttpVersion::Http11.as_i32() as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn resp_version_set(caller: Caller<'_, GuestCtx>, handle: i32, version: i32) -> i32 {
    tracing::debug!(handle, version, "resp_version_set");

    if caller.data().responses.get(handle).is_none() {
        return XqdStatus::InvalidHandle.as_i32();
    }

    if HttpVersion::from_i32(version) != Some(HttpVersion::Http11) {
        tracing::debug!(handle, version, "resp_version_set: unsupported version");
        return XqdStatus::Unsupported.as_i32();
    }

    XqdStatus::Ok.as_i32()
}

pub(crate) fn resp_header_names_get(
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

    tracing::debug!(handle, cursor, "resp_header_names_get");

    let names: Vec<String> = match caller.data().responses.get(handle) {
        Some(w) => w.headers.names().map(str::to_string).collect(),
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    let data = mem.data_mut(&mut caller);
    write_multivalue(data, &names, addr, maxlen, cursor, ending_cursor_out, nwritten_out)
}

pub(crate) fn resp_header_value_get(
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

    let value = match caller.data().responses.get(handle) {
        Some(w) => w.headers.first(&name).map(str::to_string),
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, "resp_header_value_get");

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

pub(crate) fn resp_header_values_get(
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

    tracing::debug!(handle, header = %name, cursor, "resp_header_values_get");

    let mut values: Vec<String> = match caller.data().responses.get(handle) {
        Some(w) => w.headers.values(&name).to_vec(),
        None => return XqdStatus::InvalidHandle.as_i32(),
    };
    values.sort();

    let data = mem.data_mut(&mut caller);
    write_multivalue(data, &values, addr, maxlen, cursor, ending_cursor_out, nwritten_out)
}

pub(crate) fn resp_header_values_set(
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

    let w = match caller.data_mut().responses.get_mut(handle) {
        Some(w) => w,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, values = ?values, "resp_header_values_set");
    w.headers.set(&name, values);
    XqdStatus::Ok.as_i32()
}

pub(crate) fn resp_header_insert(
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

    let w = match caller.data_mut().responses.get_mut(handle) {
        Some(w) => w,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, value = %value, "resp_header_insert");
    w.headers.insert(&name, value);
    XqdStatus::Ok.as_i32()
}

pub(crate) fn resp_header_append(
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

    let w = match caller.data_mut().responses.get_mut(handle) {
        Some(w) => w,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, value = %value, "resp_header_append");
    w.headers.append(&name, value);
    XqdStatus::Ok.as_i32()
}

pub(crate) fn resp_header_remove(
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

    let w = match caller.data_mut().responses.get_mut(handle) {
        Some(w) => w,
        None => return XqdStatus::InvalidHandle.as_i32(),
    };

    tracing::debug!(handle, header = %name, "resp_header_remove");
    w.headers.remove(&name);
    XqdStatus::Ok.as_i32()
}

/// Flush `(handle, body_handle)` downstream: headers copied, status written,
/// body drained into the recorder the outer server reads back.
///
/// Streaming mode is a host fault, not an ABI error; the trap tears the
/// instance down and the server answers 500.
pub(crate) fn resp_send_downstream(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    body_handle: i32,
    stream: i32,
) -> anyhow::Result<i32> {
    tracing::debug!(handle, body = body_handle, stream, "resp_send_downstream");

    if stream != 0 {
        anyhow::bail!("streaming responses downstream is not supported");
    }

    let (status, headers) = match caller.data().responses.get(handle) {
        Some(w) => (w.status, w.headers.clone()),
        None => return Ok(XqdStatus::InvalidHandle.as_i32()),
    };

    let body = match caller.data().bodies.drain(body_handle) {
        Ok(b) => b,
        Err(e) => return Ok(e.to_i32()),
    };

    let header_map = match headers.to_header_map() {
        Ok(m) => m,
        Err(e) => return Ok(e.to_i32()),
    };

    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    *resp.headers_mut() = header_map;

    caller.data_mut().response = Some(resp);
    Ok(XqdStatus::Ok.as_i32())
}

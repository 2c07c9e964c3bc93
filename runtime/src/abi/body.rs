//! `fastly_http_body` — body creation, IO, concatenation, and close.

use wasmtime::Caller;

use fastlike_hostapi::XqdStatus;

use crate::instance::GuestCtx;
use crate::memory;

pub(crate) fn body_new(mut caller: Caller<'_, GuestCtx>, handle_out: i32) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let id = caller.data().bodies.new_buffer();
    tracing::debug!(handle = id, "body_new");

    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, handle_out, id as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn body_write(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    addr: i32,
    size: i32,
    body_end: i32,
    nwritten_out: i32,
) -> i32 {
    tracing::debug!(handle, size, body_end, "body_write");

    // Only appending at the back is supported; a front write is reserved
    // until the contract for it settles.
    match body_end {
        0 => {}
        1 => return XqdStatus::Unsupported.as_i32(),
        _ => return XqdStatus::InvalidArgument.as_i32(),
    }

    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let bytes = {
        let data = mem.data(&caller);
        match memory::read_bytes(data, addr, size) {
            Ok(b) => b,
            Err(e) => return e.to_i32(),
        }
    };

    let nwritten = match caller.data().bodies.write(handle, &bytes) {
        Ok(n) => n,
        Err(e) => return e.to_i32(),
    };

    let data = mem.data_mut(&mut caller);
    if memory::put_u32(data, nwritten_out, nwritten as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn body_read(
    mut caller: Caller<'_, GuestCtx>,
    handle: i32,
    addr: i32,
    maxlen: i32,
    nread_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    if maxlen < 0 {
        return XqdStatus::InvalidArgument.as_i32();
    }

    let chunk = match caller.data().bodies.read(handle, maxlen as u64) {
        Ok(c) => c,
        Err(e) => return e.to_i32(),
    };

    tracing::debug!(handle, nread = chunk.len(), "body_read");

    let data = mem.data_mut(&mut caller);
    let nwritten = match memory::write_bytes(data, addr, &chunk) {
        Ok(n) => n,
        Err(e) => return e.to_i32(),
    };
    if memory::put_u32(data, nread_out, nwritten as u32).is_err() {
        return XqdStatus::Error.as_i32();
    }
    XqdStatus::Ok.as_i32()
}

pub(crate) fn body_append(mut caller: Caller<'_, GuestCtx>, dst: i32, src: i32) -> i32 {
    tracing::debug!(dst, src, "body_append");

    match caller.data_mut().bodies.append(dst, src) {
        Ok(()) => XqdStatus::Ok.as_i32(),
        Err(e) => e.to_i32(),
    }
}

pub(crate) fn body_close(caller: Caller<'_, GuestCtx>, handle: i32) -> i32 {
    tracing::debug!(handle, "body_close");

    // Close releases the backing and is idempotent on unknown handles.
    caller.data().bodies.close(handle);
    XqdStatus::Ok.as_i32()
}

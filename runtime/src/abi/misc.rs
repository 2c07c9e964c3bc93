//! `fastly_abi` and `fastly_uap` — initialisation and the user-agent stub.

use wasmtime::Caller;

use fastlike_hostapi::XqdStatus;

use crate::instance::GuestCtx;
use crate::memory;

/// `fastly_abi::init` — accepts any requested ABI version.
pub(crate) fn abi_init(_caller: Caller<'_, GuestCtx>, abi_version: i64) -> i32 {
    tracing::debug!(abi_version, "init");
    XqdStatus::Ok.as_i32()
}

/// `fastly_uap::parse` — conformant to signature, synthetic output.
///
/// Real user-agent parsing is out of scope; every agent parses to the same
/// family/major/minor/patch so guests that branch on the fields stay
/// functional.
#[allow(clippy::too_many_arguments)]
pub(crate) fn uap_parse(
    mut caller: Caller<'_, GuestCtx>,
    ua_addr: i32,
    ua_size: i32,
    family_addr: i32,
    family_maxlen: i32,
    family_nwritten_out: i32,
    major_addr: i32,
    major_maxlen: i32,
    major_nwritten_out: i32,
    minor_addr: i32,
    minor_maxlen: i32,
    minor_nwritten_out: i32,
    patch_addr: i32,
    patch_maxlen: i32,
    patch_nwritten_out: i32,
) -> i32 {
    let mem = match super::memory_of(&mut caller) {
        Some(m) => m,
        None => return XqdStatus::Error.as_i32(),
    };

    let user_agent = {
        let data = mem.data(&caller);
        match memory::read_string(data, ua_addr, ua_size) {
            Ok(s) => s,
            Err(e) => return e.to_i32(),
        }
    };
    tracing::debug!(user_agent = %user_agent, "uap_parse: synthetic result");

    let fields: [(&str, i32, i32, i32); 4] = [
        ("Fastlike", family_addr, family_maxlen, family_nwritten_out),
        ("1", major_addr, major_maxlen, major_nwritten_out),
        ("0", minor_addr, minor_maxlen, minor_nwritten_out),
        ("0", patch_addr, patch_maxlen, patch_nwritten_out),
    ];

    let data = mem.data_mut(&mut caller);
    for (value, addr, maxlen, nwritten_out) in fields {
        if value.len() > maxlen as usize {
            return XqdStatus::BufferLength.as_i32();
        }
        let nwritten = match memory::write_bytes(data, addr, value.as_bytes()) {
            Ok(n) => n,
            Err(e) => return e.to_i32(),
        };
        if memory::put_u32(data, nwritten_out, nwritten as u32).is_err() {
            return XqdStatus::Error.as_i32();
        }
    }

    XqdStatus::Ok.as_i32()
}

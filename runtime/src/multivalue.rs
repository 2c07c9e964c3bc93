//! Multi-value cursor protocol — list-of-strings results across host calls.
//!
//! Several host calls return a list of variable-length strings (header
//! names, header values). The guest supplies a destination buffer, a cursor
//! naming the first list index to emit, and two out-pointers. The host packs
//! as many items as fit, each NUL-terminated, writes the byte count to
//! `nwritten_out`, and writes either the next cursor or -1 (exhausted) to
//! `ending_cursor_out`. If the item at the starting cursor does not fit the
//! buffer at all, the call reports `BufferLength` and the guest retries with
//! a larger buffer.
//!
//! Callers sort the item list before encoding so cursor progress is
//! deterministic across calls.

use fastlike_hostapi::XqdStatus;

use crate::memory;

/// Encode `items[cursor..]` into guest memory at `(addr, maxlen)`.
///
/// Returns the ABI status code; on success `nwritten_out` holds the bytes
/// written and `ending_cursor_out` holds the next cursor or -1.
pub fn write_multivalue(
    mem: &mut [u8],
    items: &[String],
    addr: i32,
    maxlen: i32,
    cursor: i32,
    ending_cursor_out: i32,
    nwritten_out: i32,
) -> i32 {
    if maxlen < 0 || cursor < 0 {
        return XqdStatus::InvalidArgument.as_i32();
    }
    let start = cursor as usize;

    // Exhausted (or empty) list: nothing to write, cursor goes to -1.
    if start >= items.len() {
        if memory::put_u32(mem, nwritten_out, 0).is_err()
            || memory::put_i64(mem, ending_cursor_out, -1).is_err()
        {
            return XqdStatus::Error.as_i32();
        }
        return XqdStatus::Ok.as_i32();
    }

    let room = maxlen as usize;
    let mut packed: Vec<u8> = Vec::new();
    let mut next = start;
    for item in &items[start..] {
        if packed.len() + item.len() + 1 > room {
            break;
        }
        packed.extend_from_slice(item.as_bytes());
        packed.push(0);
        next += 1;
    }

    // Not even the first requested item fits; the guest must grow its buffer.
    if next == start {
        return XqdStatus::BufferLength.as_i32();
    }

    let nwritten = match memory::write_bytes(mem, addr, &packed) {
        Ok(n) => n,
        Err(_) => return XqdStatus::Error.as_i32(),
    };

    let ending = if next >= items.len() { -1 } else { next as i64 };
    if memory::put_u32(mem, nwritten_out, nwritten as u32).is_err()
        || memory::put_i64(mem, ending_cursor_out, ending).is_err()
    {
        return XqdStatus::Error.as_i32();
    }

    XqdStatus::Ok.as_i32()
}

//! Guest linear memory view — typed read/write helpers.
//!
//! Offsets are guest-pointer values handed in over the ABI. Every access is
//! bounds-checked against the linear memory slice; an out-of-range access
//! surfaces as a `HostError` which the ABI layer reports as the generic
//! error status. Integer stores are little-endian at naturally aligned
//! offsets per the ABI.

use fastlike_hostapi::HostError;

fn range(mem_len: usize, addr: i32, len: usize) -> Result<(usize, usize), HostError> {
    if addr < 0 {
        return Err(HostError::Internal(format!("negative guest pointer {}", addr)));
    }
    let start = addr as usize;
    let end = start
        .checked_add(len)
        .ok_or_else(|| HostError::Internal("guest pointer overflow".into()))?;
    if end > mem_len {
        return Err(HostError::Internal(format!(
            "guest range {}..{} exceeds memory of {} bytes",
            start, end, mem_len
        )));
    }
    Ok((start, end))
}

/// Read `len` bytes from guest memory at `addr`.
pub fn read_bytes(mem: &[u8], addr: i32, len: i32) -> Result<Vec<u8>, HostError> {
    if len < 0 {
        return Err(HostError::Internal(format!("negative length {}", len)));
    }
    let (start, end) = range(mem.len(), addr, len as usize)?;
    Ok(mem[start..end].to_vec())
}

/// Read `len` bytes from guest memory at `addr` as UTF-8.
pub fn read_string(mem: &[u8], addr: i32, len: i32) -> Result<String, HostError> {
    let bytes = read_bytes(mem, addr, len)?;
    String::from_utf8(bytes).map_err(|_| HostError::http_parse())
}

/// Write `data` to guest memory at `addr`, returning bytes written.
pub fn write_bytes(mem: &mut [u8], addr: i32, data: &[u8]) -> Result<usize, HostError> {
    let (start, end) = range(mem.len(), addr, data.len())?;
    mem[start..end].copy_from_slice(data);
    Ok(data.len())
}

/// Store a u32 little-endian at `addr`.
pub fn put_u32(mem: &mut [u8], addr: i32, value: u32) -> Result<(), HostError> {
    write_bytes(mem, addr, &value.to_le_bytes()).map(|_| ())
}

/// Store an i64 little-endian at `addr`.
pub fn put_i64(mem: &mut [u8], addr: i32, value: i64) -> Result<(), HostError> {
    write_bytes(mem, addr, &value.to_le_bytes()).map(|_| ())
}

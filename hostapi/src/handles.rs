//! Per-instance handle tables for requests, responses, and bodies.
//!
//! Handles are non-negative 32-bit integers scoped to one instance and one
//! table. Request and response tables are dense and append-only; bodies use a
//! sparse table behind a reader/writer lock because they can be individually
//! closed while other host calls hold handles into the table.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{PoisonError, RwLock};

use http::{Method, StatusCode};
use url::Url;

use crate::body::Body;
use crate::error::HostError;
use crate::headers::HeaderMultimap;
use crate::status::HttpVersion;

/// An HTTP request under guest control. The body lives behind a separate
/// body handle; `has_body` records that one has been associated.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    pub method: Method,
    pub url: Option<Url>,
    pub version: HttpVersion,
    pub headers: HeaderMultimap,
    pub has_body: bool,
}

impl RequestHandle {
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            url: None,
            version: HttpVersion::Http11,
            headers: HeaderMultimap::new(),
            has_body: false,
        }
    }
}

impl Default for RequestHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Dense request-handle table.
#[derive(Default)]
pub struct RequestHandles {
    handles: Vec<RequestHandle>,
}

impl RequestHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prepared handle, returning its id.
    pub fn insert(&mut self, handle: RequestHandle) -> i32 {
        self.handles.push(handle);
        (self.handles.len() - 1) as i32
    }

    /// Allocate a fresh empty request, returning its id.
    pub fn new_handle(&mut self) -> i32 {
        self.insert(RequestHandle::new())
    }

    pub fn get(&self, id: i32) -> Option<&RequestHandle> {
        usize::try_from(id).ok().and_then(|i| self.handles.get(i))
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut RequestHandle> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.handles.get_mut(i))
    }
}

/// An HTTP response under guest control. The status defaults to 200; the
/// reason text always derives from the code.
#[derive(Debug, Clone)]
pub struct ResponseHandle {
    pub status: StatusCode,
    pub version: HttpVersion,
    pub headers: HeaderMultimap,
    pub has_body: bool,
}

impl ResponseHandle {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            version: HttpVersion::Http11,
            headers: HeaderMultimap::new(),
            has_body: false,
        }
    }
}

impl Default for ResponseHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Dense response-handle table.
#[derive(Default)]
pub struct ResponseHandles {
    handles: Vec<ResponseHandle>,
}

impl ResponseHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: ResponseHandle) -> i32 {
        self.handles.push(handle);
        (self.handles.len() - 1) as i32
    }

    pub fn new_handle(&mut self) -> i32 {
        self.insert(ResponseHandle::new())
    }

    pub fn get(&self, id: i32) -> Option<&ResponseHandle> {
        usize::try_from(id).ok().and_then(|i| self.handles.get(i))
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut ResponseHandle> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.handles.get_mut(i))
    }
}

struct BodyTable {
    next_id: i32,
    handles: HashMap<i32, Body>,
}

/// Sparse body-handle table keyed by a monotonically increasing counter.
///
/// The table sits behind an `RwLock` so a `close` cannot race a concurrent
/// lookup from another thread holding the same instance.
pub struct BodyHandles {
    inner: RwLock<BodyTable>,
}

impl BodyHandles {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BodyTable {
                next_id: 0,
                handles: HashMap::new(),
            }),
        }
    }

    fn add(&self, body: Body) -> i32 {
        let mut table = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let id = table.next_id;
        table.next_id += 1;
        table.handles.insert(id, body);
        id
    }

    /// Allocate a buffer-backed body.
    pub fn new_buffer(&self) -> i32 {
        self.add(Body::buffer())
    }

    /// Allocate a body wrapping an upstream reader.
    pub fn new_reader(&self, reader: Box<dyn Read + Send>) -> i32 {
        self.add(Body::from_reader(reader))
    }

    /// Allocate a body wrapping a downstream sink.
    pub fn new_writer(&self, writer: Box<dyn Write + Send>) -> i32 {
        self.add(Body::from_writer(writer))
    }

    pub fn contains(&self, id: i32) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handles
            .contains_key(&id)
    }

    /// Bytes written to the body so far, or -1 if never written.
    pub fn size(&self, id: i32) -> Result<i64, HostError> {
        let table = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let body = table.handles.get(&id).ok_or_else(HostError::invalid_handle)?;
        Ok(body.size())
    }

    /// Append `buf` to the body's writer, returning bytes written.
    pub fn write(&self, id: i32, buf: &[u8]) -> Result<usize, HostError> {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let body = table
            .handles
            .get_mut(&id)
            .ok_or_else(HostError::invalid_handle)?;
        let n = body.write(buf)?;
        Ok(n)
    }

    /// Read at most `maxlen` bytes from the body's reader.
    pub fn read(&self, id: i32, maxlen: u64) -> Result<Vec<u8>, HostError> {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let body = table
            .handles
            .get_mut(&id)
            .ok_or_else(HostError::invalid_handle)?;
        Ok(body.read_at_most(maxlen)?)
    }

    /// Drain the body's reader to EOF.
    pub fn drain(&self, id: i32) -> Result<Vec<u8>, HostError> {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let body = table
            .handles
            .get_mut(&id)
            .ok_or_else(HostError::invalid_handle)?;
        Ok(body.read_to_end()?)
    }

    /// Make `dst`'s reader the lazy concatenation `dst ++ src`.
    ///
    /// `src` stays open in the table; its reader half moves into the chain,
    /// so direct reads of `src` afterwards yield EOF.
    pub fn append(&self, dst: i32, src: i32) -> Result<(), HostError> {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !table.handles.contains_key(&dst) {
            return Err(HostError::invalid_handle());
        }
        let src_reader = table
            .handles
            .get_mut(&src)
            .ok_or_else(HostError::invalid_handle)?
            .take_reader();
        let body = table
            .handles
            .get_mut(&dst)
            .ok_or_else(HostError::invalid_handle)?;
        body.chain(src_reader);
        Ok(())
    }

    /// Remove the body and release its backing. Idempotent on unknown ids.
    pub fn close(&self, id: i32) {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        table.handles.remove(&id);
    }
}

impl Default for BodyHandles {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_handles_distinct_ids() {
        let mut requests = RequestHandles::new();
        let a = requests.new_handle();
        let b = requests.new_handle();
        let c = requests.new_handle();
        assert_eq!((a, b, c), (0, 1, 2));
        assert!(requests.get(a).is_some());
        assert!(requests.get(c).is_some());
    }

    #[test]
    fn test_request_lookup_out_of_range_is_absent() {
        let mut requests = RequestHandles::new();
        requests.new_handle();
        assert!(requests.get(1).is_none());
        assert!(requests.get(-1).is_none());
        assert!(requests.get(i32::MAX).is_none());
    }

    #[test]
    fn test_request_mutation_sticks() {
        let mut requests = RequestHandles::new();
        let id = requests.new_handle();
        requests.get_mut(id).unwrap().method = Method::POST;
        assert_eq!(requests.get(id).unwrap().method, Method::POST);
    }

    #[test]
    fn test_response_defaults_to_200() {
        let mut responses = ResponseHandles::new();
        let id = responses.new_handle();
        assert_eq!(responses.get(id).unwrap().status, StatusCode::OK);
    }

    #[test]
    fn test_body_ids_are_not_reused() {
        let bodies = BodyHandles::new();
        let a = bodies.new_buffer();
        bodies.close(a);
        let b = bodies.new_buffer();
        assert_ne!(a, b);
    }

    #[test]
    fn test_body_write_read_roundtrip() {
        let bodies = BodyHandles::new();
        let id = bodies.new_buffer();
        bodies.write(id, b"foo=").unwrap();
        bodies.write(id, b"bar").unwrap();
        assert_eq!(bodies.read(id, 1024).unwrap(), b"foo=bar");
    }

    #[test]
    fn test_body_append_concatenates() {
        let bodies = BodyHandles::new();
        let dst = bodies.new_buffer();
        let src = bodies.new_reader(Box::new(Cursor::new(b"-tail".to_vec())));
        bodies.write(dst, b"head").unwrap();
        bodies.append(dst, src).unwrap();
        assert_eq!(bodies.drain(dst).unwrap(), b"head-tail");
        // src is still open, just drained
        assert!(bodies.contains(src));
        assert!(bodies.drain(src).unwrap().is_empty());
    }

    #[test]
    fn test_body_append_unknown_handles() {
        let bodies = BodyHandles::new();
        let dst = bodies.new_buffer();
        assert_eq!(bodies.append(dst, 99).unwrap_err().to_i32(), 3);
        assert_eq!(bodies.append(99, dst).unwrap_err().to_i32(), 3);
    }

    #[test]
    fn test_body_close_is_idempotent() {
        let bodies = BodyHandles::new();
        let id = bodies.new_buffer();
        bodies.close(id);
        bodies.close(id);
        bodies.close(12345);
        assert!(!bodies.contains(id));
    }

    #[test]
    fn test_body_unknown_handle_errors() {
        let bodies = BodyHandles::new();
        assert_eq!(bodies.write(7, b"x").unwrap_err().to_i32(), 3);
        assert_eq!(bodies.read(7, 10).unwrap_err().to_i32(), 3);
        assert_eq!(bodies.size(7).unwrap_err().to_i32(), 3);
    }
}

//! Body objects — uni-directional byte streams behind body handles.
//!
//! A body is a (reader, writer) pair over one of three backings:
//!
//! - **Buffer** — a growable FIFO shared by both halves, so bytes written are
//!   read back from the same storage
//! - **Reader** — an upstream byte source (downstream request body, backend
//!   response body); writes are discarded
//! - **Writer** — a downstream sink; reads yield EOF
//!
//! `append` chains a second reader after the current one without copying, so
//! bodies wrapping network readers of unknown size concatenate lazily.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Growable FIFO shared between the reader and writer halves of a buffer
/// body. Cloning shares the storage.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<VecDeque<u8>>>);

impl SharedBuffer {
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Read for SharedBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lock().read(buf)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A body stream. Readable and writable, though depending on the backing one
/// of the two directions may be inert.
pub struct Body {
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    length: u64,
}

impl Body {
    /// A buffer-backed body: written bytes are read back in order.
    pub fn buffer() -> Self {
        let buf = SharedBuffer::default();
        Self {
            reader: Box::new(buf.clone()),
            writer: Box::new(buf),
            length: 0,
        }
    }

    /// A body over an upstream byte source. Writes are discarded.
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader,
            writer: Box::new(io::sink()),
            length: 0,
        }
    }

    /// A body over a downstream sink. Reads yield EOF.
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            reader: Box::new(io::empty()),
            writer,
            length: 0,
        }
    }

    /// Bytes written so far, or -1 if nothing has been written.
    pub fn size(&self) -> i64 {
        if self.length == 0 {
            return -1;
        }
        self.length as i64
    }

    /// Read at most `maxlen` bytes, draining the reader up to EOF.
    pub fn read_at_most(&mut self, maxlen: u64) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.reader.by_ref().take(maxlen).read_to_end(&mut out)?;
        Ok(out)
    }

    /// Drain the reader to EOF.
    pub fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.reader.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Detach this body's reader half, leaving an EOF reader in its place.
    pub fn take_reader(&mut self) -> Box<dyn Read + Send> {
        std::mem::replace(&mut self.reader, Box::new(io::empty()))
    }

    /// Make this body's reader the chain `self ++ src`: reads exhaust the
    /// current reader first, then drain `src`.
    pub fn chain(&mut self, src: Box<dyn Read + Send>) {
        let original = self.take_reader();
        self.reader = Box::new(original.chain(src));
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Write for Body {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.length += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_buffer_read_after_write() {
        let mut body = Body::buffer();
        body.write_all(b"foo=").unwrap();
        body.write_all(b"bar").unwrap();
        assert_eq!(body.read_to_end().unwrap(), b"foo=bar");
    }

    #[test]
    fn test_size_tracks_written_bytes() {
        let mut body = Body::buffer();
        assert_eq!(body.size(), -1);
        body.write_all(b"hello").unwrap();
        assert_eq!(body.size(), 5);
        body.write_all(b"!").unwrap();
        assert_eq!(body.size(), 6);
    }

    #[test]
    fn test_reader_body_discards_writes() {
        let mut body = Body::from_reader(Box::new(Cursor::new(b"upstream".to_vec())));
        body.write_all(b"dropped").unwrap();
        assert_eq!(body.read_to_end().unwrap(), b"upstream");
    }

    #[test]
    fn test_writer_body_reads_eof() {
        let mut body = Body::from_writer(Box::new(io::sink()));
        assert!(body.read_to_end().unwrap().is_empty());
    }

    #[test]
    fn test_read_at_most_limits() {
        let mut body = Body::buffer();
        body.write_all(b"abcdef").unwrap();
        assert_eq!(body.read_at_most(4).unwrap(), b"abcd");
        assert_eq!(body.read_at_most(100).unwrap(), b"ef");
        assert!(body.read_at_most(100).unwrap().is_empty());
    }

    #[test]
    fn test_chain_concatenates() {
        let mut dst = Body::buffer();
        dst.write_all(b"first").unwrap();
        Body::chain(&mut dst, Box::new(Cursor::new(b"-second".to_vec())));
        assert_eq!(dst.read_to_end().unwrap(), b"first-second");
    }

    #[test]
    fn test_chain_after_partial_read() {
        let mut dst = Body::buffer();
        dst.write_all(b"abc").unwrap();
        assert_eq!(dst.read_at_most(1).unwrap(), b"a");
        Body::chain(&mut dst, Box::new(Cursor::new(b"def".to_vec())));
        assert_eq!(dst.read_to_end().unwrap(), b"bcdef");
    }

    #[test]
    fn test_take_reader_leaves_eof() {
        let mut body = Body::from_reader(Box::new(Cursor::new(b"xyz".to_vec())));
        let mut taken = body.take_reader();
        let mut out = Vec::new();
        taken.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"xyz");
        assert!(body.read_to_end().unwrap().is_empty());
    }
}

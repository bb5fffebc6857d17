//! In-memory streams for running commands without touching the terminal.
//!
//! Builtins write straight into these buffers. External commands cannot, so they
//! get a null stream instead: use a redirect target file to capture their output.
//! The completion helper can also be pointed at a [`MemWriter`] to observe its bell
//! and listings.
//!
//! ```
//! use minish::Interpreter;
//! use minish::command::Streams;
//! use minish::io_adapters::{MemReader, MemWriter};
//!
//! let mut sh = Interpreter::default();
//! let (out, captured) = MemWriter::with_handle();
//! let streams = Streams {
//!     stdin: Box::new(MemReader::new(Vec::new())),
//!     stdout: Box::new(out),
//!     stderr: Box::new(MemWriter::new()),
//! };
//! sh.execute_line_with("echo 'captured  text'", streams).unwrap();
//! assert_eq!(captured.borrow().as_slice(), b"captured  text\n");
//! ```

use std::cell::RefCell;
use std::io::{Cursor, Read, Result as IoResult, Write};
use std::process::Stdio;
use std::rc::Rc;

/// Standard input served from a byte buffer.
pub struct MemReader(Cursor<Vec<u8>>);

impl MemReader {
    pub fn new(input: Vec<u8>) -> Self {
        Self(Cursor::new(input))
    }
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.0.read(buf)
    }
}

impl crate::command::Stdin for MemReader {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}

/// Shared capture buffer behind a [`MemWriter`].
pub type Captured = Rc<RefCell<Vec<u8>>>;

/// Output sink appending to a [`Captured`] buffer the caller keeps a handle to.
#[derive(Default)]
pub struct MemWriter(Captured);

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer together with the handle its output lands in.
    pub fn with_handle() -> (Self, Captured) {
        let writer = Self::new();
        let handle = Rc::clone(&writer.0);
        (writer, handle)
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.0.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl crate::command::Stdout for MemWriter {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}

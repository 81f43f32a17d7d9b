//! Destination for error reports.
//!
//! Escaped control actions and uncaught errors are written here. Embedders
//! pick stderr, a capture buffer, or nothing.

use std::sync::Arc;

use parking_lot::Mutex;

/// Error stream that captures to a buffer.
#[derive(Default)]
pub struct BufferErrorStream {
    buffer: Mutex<String>,
}

impl BufferErrorStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn println(&self, msg: &str) {
        let mut buf = self.buffer.lock();
        buf.push_str(msg);
        buf.push('\n');
    }

    pub fn output(&self) -> String {
        self.buffer.lock().clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

/// Error stream implementation using enum dispatch.
pub enum ErrorStream {
    /// Writes to the process's stderr (default).
    Stderr,
    /// Captures to a buffer (tests, embedding).
    Buffer(BufferErrorStream),
    /// Discards everything.
    Silent,
}

impl ErrorStream {
    pub fn println(&self, msg: &str) {
        match self {
            Self::Stderr => eprintln!("{msg}"),
            Self::Buffer(stream) => stream.println(msg),
            Self::Silent => {}
        }
    }

    /// Captured output; empty for streams that don't capture.
    pub fn output(&self) -> String {
        match self {
            Self::Buffer(stream) => stream.output(),
            Self::Stderr | Self::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(stream) = self {
            stream.clear();
        }
    }
}

/// Error stream shared between the runtime and its embedder.
pub type SharedErrorStream = Arc<ErrorStream>;

pub fn stderr_stream() -> SharedErrorStream {
    Arc::new(ErrorStream::Stderr)
}

pub fn buffer_stream() -> SharedErrorStream {
    Arc::new(ErrorStream::Buffer(BufferErrorStream::new()))
}

pub fn silent_stream() -> SharedErrorStream {
    Arc::new(ErrorStream::Silent)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn buffer_stream_captures_lines() {
        let stream = buffer_stream();
        stream.println("break without block.");
        stream.println("second");
        assert_eq!(stream.output(), "break without block.\nsecond\n");
    }

    #[test]
    fn buffer_stream_clear() {
        let stream = buffer_stream();
        stream.println("x");
        stream.clear();
        assert_eq!(stream.output(), "");
    }

    #[test]
    fn non_capturing_streams_report_nothing() {
        let silent = silent_stream();
        silent.println("dropped");
        assert_eq!(silent.output(), "");
        assert_eq!(stderr_stream().output(), "");
    }
}

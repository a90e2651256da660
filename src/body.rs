use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_lite::io::Cursor;
use futures_lite::AsyncRead;

/// A streaming HTTP body.
///
/// Owns at most one byte stream plus the framing information the
/// orchestration layer needs: a body with a known length is sent with
/// `Content-Length`, a body without one is sent chunked.
pub struct Body {
    reader: Option<Box<dyn AsyncRead + Send + Sync + Unpin + 'static>>,
    length: Option<u64>,
    chunked: bool,
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("length", &self.length)
            .field("chunked", &self.chunked)
            .finish()
    }
}

impl Body {
    /// Create a new empty body.
    pub fn empty() -> Self {
        Self {
            reader: None,
            length: Some(0),
            chunked: false,
        }
    }

    /// Create a body from in-memory bytes. The length is known, so the
    /// body is framed with `Content-Length`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let length = bytes.len() as u64;
        Self {
            reader: Some(Box::new(Cursor::new(bytes))),
            length: Some(length),
            chunked: false,
        }
    }

    /// Create a body from a reader. Without a known length the body is
    /// framed with `Transfer-Encoding: chunked`.
    pub fn from_reader(
        reader: impl AsyncRead + Send + Sync + Unpin + 'static,
        length: Option<u64>,
    ) -> Self {
        Self {
            reader: Some(Box::new(reader)),
            chunked: length.is_none(),
            length,
        }
    }

    /// The body length, if known ahead of transmission.
    pub fn len(&self) -> Option<u64> {
        self.length
    }

    /// Whether the body carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.length == Some(0)
    }

    /// Whether the body is framed with chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::from_bytes(text.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::from_bytes(text.as_bytes().to_vec())
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        match self.reader.as_mut() {
            None => Poll::Ready(Ok(0)),
            Some(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_lite::{ready, AsyncRead};

use crate::buffer::InterceptorBuffer;

/// Data bytes taken from the inner reader per frame.
const CHUNK_DATA: usize = 1024;

/// Room in the frame buffer for the hex length prefix and both CRLFs.
const FRAME_OVERHEAD: usize = 16;

/// An encoder for chunked transfer encoding.
///
/// Each read from the inner body is framed as `<hex-length>\r\n<bytes>\r\n`
/// inside an internal buffer, and the caller's buffer is served from that.
/// A caller buffer of any size therefore sees the complete wire form; a
/// frame is never truncated to fit. The `0\r\n\r\n` terminator is emitted
/// once the inner reader reports end-of-stream.
#[derive(Debug)]
pub(crate) struct ChunkedEncoder<R> {
    reader: R,
    frame: InterceptorBuffer,
    done: bool,
}

impl<R: AsyncRead + Unpin> ChunkedEncoder<R> {
    /// Create a new instance.
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            frame: InterceptorBuffer::new(CHUNK_DATA + FRAME_OVERHEAD),
            done: false,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ChunkedEncoder<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        loop {
            // Drain the framed bytes first; only once the frame buffer is
            // empty may the encoder report end-of-stream.
            if !self.frame.is_empty() {
                let n = self.frame.len().min(buf.len());
                buf[..n].copy_from_slice(&self.frame.filled()[..n]);
                self.frame.remove_block(0, n);
                return Poll::Ready(Ok(n));
            }
            if self.done {
                return Poll::Ready(Ok(0));
            }

            let mut data = [0u8; CHUNK_DATA];
            let n = ready!(Pin::new(&mut self.reader).poll_read(cx, &mut data))?;
            if n == 0 {
                self.done = true;
            }
            let prefix = format!("{:X}\r\n", n);
            self.frame.append(prefix.as_bytes())?;
            self.frame.append(&data[..n])?;
            self.frame.append(b"\r\n")?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::AsyncReadExt;

    #[test]
    fn frames_and_terminates() {
        async_std::task::block_on(async move {
            let body = futures_lite::io::Cursor::new(b"Hello".to_vec());
            let mut encoder = ChunkedEncoder::new(body);

            let mut wire = Vec::new();
            encoder.read_to_end(&mut wire).await.unwrap();
            assert_eq!(wire, b"5\r\nHello\r\n0\r\n\r\n");
        });
    }

    #[test]
    fn empty_body_is_just_the_terminator() {
        async_std::task::block_on(async move {
            let body = futures_lite::io::Cursor::new(Vec::new());
            let mut encoder = ChunkedEncoder::new(body);

            let mut wire = Vec::new();
            encoder.read_to_end(&mut wire).await.unwrap();
            assert_eq!(wire, b"0\r\n\r\n");
        });
    }

    #[test]
    fn single_byte_reads_preserve_the_frames() {
        async_std::task::block_on(async move {
            let body = futures_lite::io::Cursor::new(b"Hello".to_vec());
            let mut encoder = ChunkedEncoder::new(body);

            let mut wire = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                match encoder.read(&mut byte).await.unwrap() {
                    0 => break,
                    n => wire.extend_from_slice(&byte[..n]),
                }
            }
            assert_eq!(wire, b"5\r\nHello\r\n0\r\n\r\n");
        });
    }
}

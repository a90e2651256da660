use std::fmt::Display;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_lite::AsyncRead;
use pin_project::pin_project;

use crate::buffer::InterceptorBuffer;

/// Largest chunk size we accept before declaring the size line malformed.
const MAX_CHUNK_SIZE: u64 = 0x0FFF_FFFF_FFFF_FFFF;

/// Longest size line (hex digits plus extension) we tolerate.
const MAX_SIZE_LINE: usize = 1024;

/// Initial lookahead capacity; grows on demand, never shrinks.
const INITIAL_CAPACITY: usize = 256;

/// Decodes a chunked body, exposing a plain byte stream to callers
/// regardless of wire framing.
///
/// Framing is parsed inside an [`InterceptorBuffer`] driven by a bounded
/// loop, so pathological fragmentation of the source can never grow the
/// stack. A zero-length chunk is the authoritative end of the body; any
/// trailer lines after it are consumed and discarded.
#[pin_project]
#[derive(Debug)]
pub(crate) struct ChunkedDecoder<R> {
    /// The underlying stream.
    #[pin]
    inner: R,
    /// Raw lookahead: bytes pulled from the source but not yet decoded.
    buffer: InterceptorBuffer,
    /// Current framing state.
    state: State,
    /// Monotonic count of decoded bytes delivered to the caller.
    position: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting a hex chunk-size line.
    SizeLine,
    /// Inside a chunk; this many data bytes still owed to the caller.
    Data { remaining: u64 },
    /// Chunk data fully delivered; its trailing CRLF is still on the wire.
    AfterData,
    /// Zero chunk seen; discarding trailer lines until the blank line.
    Trailer,
    /// Terminator consumed; all further reads yield 0.
    Done,
}

impl<R: AsyncRead> ChunkedDecoder<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: InterceptorBuffer::new(INITIAL_CAPACITY),
            state: State::SizeLine,
            position: 0,
        }
    }

    /// Decoded bytes delivered so far.
    #[cfg(test)]
    pub(crate) fn position(&self) -> u64 {
        self.position
    }
}

/// Parse the hex digits of a size line. Anything after `;` is a chunk
/// extension and is ignored.
fn parse_chunk_size(line: &[u8]) -> io::Result<u64> {
    let digits = match line.iter().position(|&b| b == b';') {
        Some(idx) => &line[..idx],
        None => line,
    };
    if digits.is_empty() {
        return Err(other_err(httparse::InvalidChunkSize));
    }
    let mut size: u64 = 0;
    for &c in digits {
        let digit = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c + 10 - b'a',
            b'A'..=b'F' => c + 10 - b'A',
            _ => return Err(other_err(httparse::InvalidChunkSize)),
        };
        size = (size << 4) + u64::from(digit);
        if size > MAX_CHUNK_SIZE {
            return Err(other_err(httparse::InvalidChunkSize));
        }
    }
    Ok(size)
}

/// Pull more raw bytes from the source into the lookahead buffer,
/// expanding it when full. `Ok(0)` means the source hit end-of-stream.
fn fill<R: AsyncRead>(
    inner: Pin<&mut R>,
    cx: &mut Context<'_>,
    buffer: &mut InterceptorBuffer,
) -> Poll<io::Result<usize>> {
    if buffer.unfilled().is_empty() {
        let next = buffer.capacity() * 2;
        buffer.expand(next)?;
    }
    let n = match inner.poll_read(cx, buffer.unfilled()) {
        Poll::Ready(Ok(n)) => n,
        Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
        Poll::Pending => return Poll::Pending,
    };
    buffer.advance(n);
    Poll::Ready(Ok(n))
}

impl<R: AsyncRead> AsyncRead for ChunkedDecoder<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let mut this = self.project();
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let mut written = 0;

        // Bounded loop over framing states. A fill that would block
        // returns whatever has been decoded so far instead of parking
        // partial progress.
        loop {
            match this.state {
                State::Done => return Poll::Ready(Ok(written)),

                State::Data { remaining } => {
                    if written == buf.len() {
                        return Poll::Ready(Ok(written));
                    }
                    let wanted = buf.len() - written;

                    // Serve lookahead first; it holds chunk data that
                    // arrived in the same packet as the framing.
                    if !this.buffer.is_empty() {
                        let n = (*remaining).min(this.buffer.len() as u64) as usize;
                        let n = n.min(wanted);
                        buf[written..written + n].copy_from_slice(&this.buffer.filled()[..n]);
                        this.buffer.remove_block(0, n);
                        *remaining -= n as u64;
                        written += n;
                        *this.position += n as u64;
                    } else {
                        let max = (*remaining).min(wanted as u64) as usize;
                        let n = match this
                            .inner
                            .as_mut()
                            .poll_read(cx, &mut buf[written..written + max])
                        {
                            Poll::Ready(Ok(n)) => n,
                            Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                            Poll::Pending if written > 0 => return Poll::Ready(Ok(written)),
                            Poll::Pending => return Poll::Pending,
                        };
                        if n == 0 {
                            return Poll::Ready(Err(unexpected_eof()));
                        }
                        *remaining -= n as u64;
                        written += n;
                        *this.position += n as u64;
                    }
                    if *remaining == 0 {
                        *this.state = State::AfterData;
                    }
                }

                State::AfterData => {
                    if this.buffer.len() < 2 {
                        match fill(this.inner.as_mut(), cx, this.buffer) {
                            Poll::Ready(Ok(0)) => return Poll::Ready(Err(unexpected_eof())),
                            Poll::Ready(Ok(_)) => {}
                            Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                            Poll::Pending if written > 0 => return Poll::Ready(Ok(written)),
                            Poll::Pending => return Poll::Pending,
                        }
                        continue;
                    }
                    if &this.buffer.filled()[..2] != b"\r\n" {
                        return Poll::Ready(Err(invalid_data_err()));
                    }
                    this.buffer.remove_block(0, 2);
                    *this.state = State::SizeLine;
                }

                State::SizeLine => match this.buffer.index_of(b"\r\n") {
                    Some(idx) => {
                        let size = parse_chunk_size(&this.buffer.filled()[..idx])?;
                        this.buffer.remove_block(0, idx + 2);
                        log::trace!("chunk of {} bytes", size);
                        *this.state = if size == 0 {
                            State::Trailer
                        } else {
                            State::Data { remaining: size }
                        };
                    }
                    None => {
                        if this.buffer.len() > MAX_SIZE_LINE {
                            return Poll::Ready(Err(other_err(httparse::InvalidChunkSize)));
                        }
                        match fill(this.inner.as_mut(), cx, this.buffer) {
                            Poll::Ready(Ok(0)) => return Poll::Ready(Err(unexpected_eof())),
                            Poll::Ready(Ok(_)) => {}
                            Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                            Poll::Pending if written > 0 => return Poll::Ready(Ok(written)),
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                },

                State::Trailer => match this.buffer.index_of(b"\r\n") {
                    Some(0) => {
                        this.buffer.remove_block(0, 2);
                        *this.state = State::Done;
                    }
                    Some(idx) => {
                        log::trace!(
                            "discarding trailer line: {:?}",
                            String::from_utf8_lossy(&this.buffer.filled()[..idx])
                        );
                        this.buffer.remove_block(0, idx + 2);
                    }
                    None => {
                        // trailer lines get the same bound as the size
                        // line; a peer may not grow the buffer unchecked
                        if this.buffer.len() > MAX_SIZE_LINE {
                            return Poll::Ready(Err(io::Error::new(
                                io::ErrorKind::InvalidData,
                                "trailer line too long",
                            )));
                        }
                        match fill(this.inner.as_mut(), cx, this.buffer) {
                            Poll::Ready(Ok(0)) => return Poll::Ready(Err(unexpected_eof())),
                            Poll::Ready(Ok(_)) => {}
                            Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                            Poll::Pending if written > 0 => return Poll::Ready(Ok(written)),
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                },
            }
        }
    }
}

fn other_err<E: Display>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err.to_string())
}

fn invalid_data_err() -> io::Error {
    io::Error::from(io::ErrorKind::InvalidData)
}

fn unexpected_eof() -> io::Error {
    io::Error::from(io::ErrorKind::UnexpectedEof)
}

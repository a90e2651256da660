use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_lite::AsyncRead;

use crate::chunked::ChunkedEncoder;
use crate::{Body, Request, Result};

/// An HTTP request encoder.
///
/// Reads as the request's wire form: request line and headers first, then
/// the body, framed with `Content-Length` when the length is known ahead
/// of time or as chunked transfer encoding otherwise.
#[derive(Debug)]
pub struct Encoder {
    /// Keep track of how far we've indexed into the head.
    cursor: usize,
    /// Request line + headers to be sent.
    head: Vec<u8>,
    /// Check whether we're done sending the head.
    head_done: bool,
    /// The body to be sent, wrapped in its framing.
    body: BodyEncoder,
    /// Check whether we're done with the body.
    body_done: bool,
    /// Keep track of how many body bytes have been read.
    body_bytes_read: usize,
}

#[derive(Debug)]
enum BodyEncoder {
    Plain(Body),
    Chunked(ChunkedEncoder<Body>),
}

impl Encoder {
    /// Encode the head of `req` and set up its body framing.
    pub fn encode(mut req: Request) -> Result<Encoder> {
        let mut buf: Vec<u8> = Vec::new();

        let val = format!("{} {} HTTP/1.1\r\n", req.method(), req.target());
        log::trace!("> {}", val.trim_end());
        buf.extend_from_slice(val.as_bytes());

        let body = req.take_body();

        let mut headers = req.headers().clone();
        if headers.get("Host").is_none() {
            let host = if req.port() == 80 {
                req.host().to_owned()
            } else {
                format!("{}:{}", req.host(), req.port())
            };
            headers.insert("Host", host)?;
        }

        // If the body length is known we can set content-length ahead of
        // time. Else we send it in chunks.
        if body.is_chunked() {
            headers.insert("Transfer-Encoding", "chunked")?;
        } else {
            let len = body.len().unwrap_or(0);
            headers.insert("Content-Length", len.to_string())?;
        }

        headers.write_wire(&mut buf);
        buf.extend_from_slice(b"\r\n");

        let body = if body.is_chunked() {
            BodyEncoder::Chunked(ChunkedEncoder::new(body))
        } else {
            BodyEncoder::Plain(body)
        };

        Ok(Encoder {
            cursor: 0,
            head: buf,
            head_done: false,
            body,
            body_done: false,
            body_bytes_read: 0,
        })
    }
}

impl AsyncRead for Encoder {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        // Send the head. As long as it isn't fully sent yet we keep
        // copying more of it.
        let mut bytes_read = 0;
        if !self.head_done {
            let len = std::cmp::min(self.head.len() - self.cursor, buf.len());
            let range = self.cursor..self.cursor + len;
            buf[0..len].copy_from_slice(&self.head[range]);
            self.cursor += len;
            if self.cursor == self.head.len() {
                self.head_done = true;
            }
            bytes_read += len;
        }

        if !self.body_done {
            let remaining = &mut buf[bytes_read..];
            if remaining.is_empty() {
                // the head filled the whole buffer; the body continues on
                // the next call
                return Poll::Ready(Ok(bytes_read));
            }

            let inner_poll_result = match &mut self.body {
                BodyEncoder::Plain(body) => Pin::new(body).poll_read(cx, remaining),
                BodyEncoder::Chunked(encoder) => Pin::new(encoder).poll_read(cx, remaining),
            };
            let n = match inner_poll_result {
                Poll::Ready(Ok(n)) => n,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => {
                    if bytes_read == 0 {
                        return Poll::Pending;
                    } else {
                        return Poll::Ready(Ok(bytes_read));
                    }
                }
            };
            if n == 0 {
                self.body_done = true;
            }
            bytes_read += n;
            self.body_bytes_read += n;
        }

        Poll::Ready(Ok(bytes_read))
    }
}

//! Process HTTP connections on the client.

use std::io;
use std::net::ToSocketAddrs;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use futures_lite::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::connection::{Connection, ConnectionConfig, Direction, Progress};
use crate::{Body, Error, Request, Response, Result};

mod decode;
mod encode;

pub use decode::decode;
pub use encode::Encoder;

use decode::decode_with_capacity;

/// Opens an HTTP/1.1 conversation over a caller-supplied transport.
///
/// Useful when the caller already holds a connected stream; [`Client`]
/// adds connection lifecycle, timeouts and progress on top of this.
pub async fn connect<RW>(mut stream: RW, req: Request) -> Result<Response>
where
    RW: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
{
    let mut encoder = Encoder::encode(req)?;

    let mut req_buf = Vec::new();
    encoder.read_to_end(&mut req_buf).await?;
    stream.write_all(&req_buf).await?;
    stream.flush().await?;

    let res = decode(stream).await?;

    Ok(res)
}

/// An HTTP/1.1 client over raw TCP.
///
/// One connection per request: no pooling, no keep-alive reuse. Every
/// request terminates in exactly one of `Ok(response)`, `Err(Timeout)` or
/// `Err(transport/protocol error)`.
#[derive(Debug)]
pub struct Client {
    config: ConnectionConfig,
    progress: Option<async_channel::Sender<Progress>>,
}

impl Client {
    /// Create a client with the given per-request configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Attach a progress channel. An event is sent for every completed
    /// send/receive slice; a full channel drops events rather than stall
    /// the transfer.
    pub fn with_progress(mut self, sender: async_channel::Sender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Resolve, connect, send `req` and decode the response head. The
    /// returned response carries a streaming body; receive progress is
    /// reported as the caller drains it.
    pub async fn execute(&self, req: Request) -> Result<Response> {
        let addr = (req.host(), req.port())
            .to_socket_addrs()
            .map_err(Error::Transport)?
            .next()
            .ok_or_else(|| Error::protocol(format!("could not resolve {}", req.host())))?;

        let mut conn = Connection::connect(addr, self.config).await?;

        let mut total_sent = 0u64;

        // Write the head and body in send-buffer-sized slices.
        let mut encoder = Encoder::encode(req)?;
        let mut slice = vec![0u8; self.config.send_buffer_size.max(64)];
        loop {
            let n = encoder.read(&mut slice).await?;
            if n == 0 {
                break;
            }
            let started = Instant::now();
            conn.send(&slice[..n]).await?;
            total_sent += n as u64;
            self.emit(Direction::Send, n, started, total_sent, 0);
        }
        conn.flush().await?;

        // The connection moves into the decoder; its timers keep bounding
        // every read underneath the body stream.
        let mut res =
            decode_with_capacity(self.config.receive_buffer_size.max(64), conn).await?;

        // Keep the body streaming; a counting wrapper reports receive
        // progress as the caller drains it.
        let body = res.take_body();
        let length = body.len();
        res.set_body(Body::from_reader(
            ProgressBody {
                inner: body,
                sender: self.progress.clone(),
                started: None,
                total_sent,
                total_received: 0,
            },
            length,
        ));
        Ok(res)
    }

    fn emit(
        &self,
        direction: Direction,
        bytes: usize,
        started: Instant,
        total_sent: u64,
        total_received: u64,
    ) {
        let event = Progress {
            direction,
            bytes,
            elapsed: started.elapsed(),
            total_sent,
            total_received,
        };
        log::trace!("{:?}", event);
        if let Some(sender) = &self.progress {
            // A slow consumer must never stall the transfer.
            let _ = sender.try_send(event);
        }
    }
}

/// A body wrapper counting received bytes and reporting each completed
/// read as a [`Progress`] event.
#[derive(Debug)]
struct ProgressBody {
    inner: Body,
    sender: Option<async_channel::Sender<Progress>>,
    /// Start of the in-flight read; carried across `Pending` wakeups so
    /// `elapsed` spans the whole wait for the packet.
    started: Option<Instant>,
    total_sent: u64,
    total_received: u64,
}

impl AsyncRead for ProgressBody {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let n = match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(n)) => n,
            other => return other,
        };
        self.started = None;
        if n > 0 {
            self.total_received += n as u64;
            let event = Progress {
                direction: Direction::Receive,
                bytes: n,
                elapsed: started.elapsed(),
                total_sent: self.total_sent,
                total_received: self.total_received,
            };
            log::trace!("{:?}", event);
            if let Some(sender) = &self.sender {
                let _ = sender.try_send(event);
            }
        }
        Poll::Ready(Ok(n))
    }
}

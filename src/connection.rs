//! An asynchronous TCP connection with per-operation timeouts.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_io::{Async, Timer};
use futures_lite::{future, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Transfer direction of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes written to the peer.
    Send,
    /// Bytes read from the peer.
    Receive,
}

/// A progress notification, emitted once per completed send or receive
/// slice while a request is in flight.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// Which direction the packet travelled.
    pub direction: Direction,
    /// Size of this packet in bytes.
    pub bytes: usize,
    /// Time spent transferring this packet.
    pub elapsed: Duration,
    /// Cumulative bytes sent on the connection.
    pub total_sent: u64,
    /// Cumulative bytes received on the connection.
    pub total_received: u64,
}

/// Per-request configuration: every asynchronous operation's timer and
/// buffer allocation is bounded by these values.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Bounds connect and every send operation.
    pub send_timeout: Duration,
    /// Bounds every receive operation.
    pub receive_timeout: Duration,
    /// Slice size for writing the encoded request.
    pub send_buffer_size: usize,
    /// Read-buffer capacity for the response stream.
    pub receive_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(60),
            receive_timeout: Duration::from_secs(60),
            send_buffer_size: 8 * 1024,
            receive_buffer_size: 8 * 1024,
        }
    }
}

/// An asynchronous socket wrapper.
///
/// Every pending read or write races a timer armed from the matching
/// timeout. If the timer fires first the socket is dropped -- a forcible
/// teardown, not a graceful shutdown -- and the operation resolves with
/// `TimedOut`. Because the socket is gone, the stale completion has
/// nothing to land on: an operation resolves exactly once.
///
/// A connection that has timed out is not reusable; callers obtain a new
/// one.
pub struct Connection {
    stream: Option<Async<TcpStream>>,
    config: ConnectionConfig,
    read_timer: Option<Timer>,
    write_timer: Option<Timer>,
    bytes_sent: u64,
    bytes_received: u64,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.stream.is_some())
            .field("bytes_sent", &self.bytes_sent)
            .field("bytes_received", &self.bytes_received)
            .finish()
    }
}

impl Connection {
    /// Open a connection to `addr`. Bounded by the configured send
    /// timeout.
    pub async fn connect(addr: SocketAddr, config: ConnectionConfig) -> Result<Self> {
        log::trace!("connecting to {}", addr);
        // Race the connect against a timer; on expiry the half-open
        // socket future is dropped.
        let stream = future::or(
            async { Async::<TcpStream>::connect(addr).await.map_err(Error::from) },
            async {
                Timer::after(config.send_timeout).await;
                Err(Error::Timeout)
            },
        )
        .await?;
        Ok(Self {
            stream: Some(stream),
            config,
            read_timer: None,
            write_timer: None,
            bytes_sent: 0,
            bytes_received: 0,
        })
    }

    /// Whether the socket is still open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Cumulative bytes written.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Cumulative bytes read.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// The configuration this connection was opened with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Write all of `buf` to the peer, bounded by the send timeout.
    pub async fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.write_all(buf).await?;
        Ok(buf.len())
    }

    /// Read into `buf`, bounded by the receive timeout. Returns the number
    /// of bytes read; 0 means the peer closed the stream.
    pub async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.read(buf).await?;
        Ok(n)
    }

    /// Flush and release the socket. Safe to call repeatedly.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            log::trace!("disconnecting");
            let _ = stream.get_ref().shutdown(Shutdown::Both);
        }
        Ok(())
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection is closed")
}

fn timed_out(op: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("{} timed out", op))
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let stream = match this.stream.as_mut() {
            Some(stream) => stream,
            None => return Poll::Ready(Err(not_connected())),
        };
        match Pin::new(stream).poll_read(cx, buf) {
            Poll::Ready(Ok(n)) => {
                this.read_timer = None;
                this.bytes_received += n as u64;
                Poll::Ready(Ok(n))
            }
            Poll::Ready(Err(err)) => {
                this.read_timer = None;
                this.stream = None;
                Poll::Ready(Err(err))
            }
            Poll::Pending => {
                let dur = this.config.receive_timeout;
                let timer = this.read_timer.get_or_insert_with(|| Timer::after(dur));
                match Pin::new(timer).poll(cx) {
                    Poll::Ready(_) => {
                        log::trace!("receive timed out after {:?}", dur);
                        this.read_timer = None;
                        this.stream = None;
                        Poll::Ready(Err(timed_out("receive")))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let stream = match this.stream.as_mut() {
            Some(stream) => stream,
            None => return Poll::Ready(Err(not_connected())),
        };
        match Pin::new(stream).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                this.write_timer = None;
                this.bytes_sent += n as u64;
                Poll::Ready(Ok(n))
            }
            Poll::Ready(Err(err)) => {
                this.write_timer = None;
                this.stream = None;
                Poll::Ready(Err(err))
            }
            Poll::Pending => {
                let dur = this.config.send_timeout;
                let timer = this.write_timer.get_or_insert_with(|| Timer::after(dur));
                match Pin::new(timer).poll(cx) {
                    Poll::Ready(_) => {
                        log::trace!("send timed out after {:?}", dur);
                        this.write_timer = None;
                        this.stream = None;
                        Poll::Ready(Err(timed_out("send")))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match this.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match this.stream.as_mut() {
            Some(stream) => {
                let result = Pin::new(stream).poll_close(cx);
                if result.is_ready() {
                    this.stream = None;
                }
                result
            }
            None => Poll::Ready(Ok(())),
        }
    }
}

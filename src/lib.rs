//! Streaming async HTTP 1.1 client engine.
//!
//! At its core HTTP is a stateful RPC protocol, where a client and server
//! communicate with one another by encoding and decoding messages between
//! them. This crate owns the client half of that conversation over a raw
//! TCP socket: connection lifecycle, request/response framing, header
//! tokenization, chunked-transfer decoding, and composite request bodies
//! assembled from multiple sources.
//!
//! ```txt
//!   encode            decode
//!        \            /
//!        -> request  ->
//! client                server
//!        <- response <-
//!        /            \
//!   decode            encode
//! ```
//!
//! # Example
//!
//! ```no_run
//! use skein::{Client, ConnectionConfig, Method, Request};
//!
//! # fn main() -> skein::Result<()> {
//! futures_lite::future::block_on(async {
//!     let req = Request::new(Method::Get, "example.com", 80, "/");
//!     let client = Client::new(ConnectionConfig::default());
//!     let res = client.execute(req).await?;
//!     assert!(res.status().is_success());
//!     Ok(())
//! })
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(future_incompatible, rust_2018_idioms)]
#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]
#![cfg_attr(test, deny(warnings))]

/// The maximum amount of headers parsed on a response.
const MAX_HEADERS: usize = 128;

/// The maximum length of the head section of a response.
const MAX_HEAD_LENGTH: usize = 8 * 1024;

pub use body::Body;
pub use buffer::InterceptorBuffer;
pub use client::Client;
pub use connection::{Connection, ConnectionConfig, Direction, Progress};
pub use error::{Error, Result};
pub use headers::{HeaderCollection, Token};
pub use multisource::{envelope, MultisourcedStream, Source};
pub use request::{Method, Request};
pub use response::{Response, StatusCode};

mod body;
mod buffer;
mod chunked;
mod connection;
mod error;
mod headers;
mod multisource;
mod request;
mod response;

pub mod client;

//! Chunked transfer encoding, RFC 2616 section 3.6.1.

pub(crate) use decoder::ChunkedDecoder;
pub(crate) use encoder::ChunkedEncoder;

mod decoder;
mod encoder;

use futures_lite::io::BufReader;
use futures_lite::{AsyncBufReadExt, AsyncRead, AsyncReadExt};

use crate::chunked::ChunkedDecoder;
use crate::{Body, Error, HeaderCollection, Response, Result, StatusCode};
use crate::{MAX_HEADERS, MAX_HEAD_LENGTH};

/// Decode an HTTP response on the client.
///
/// Reads and parses the status line and headers, skipping any interim
/// `100 Continue` head, then attaches a body reader selected from the
/// framing headers: bounded by `Content-Length`, decoded from chunked
/// transfer encoding, or empty.
pub async fn decode<R>(reader: R) -> Result<Response>
where
    R: AsyncRead + Send + Sync + Unpin + 'static,
{
    decode_with_capacity(8 * 1024, reader).await
}

/// Like [`decode`], with an explicit read-buffer capacity for the
/// response stream.
pub(crate) async fn decode_with_capacity<R>(capacity: usize, reader: R) -> Result<Response>
where
    R: AsyncRead + Send + Sync + Unpin + 'static,
{
    let mut reader = BufReader::with_capacity(capacity, reader);

    let mut res = loop {
        let res = decode_head(&mut reader).await?;
        if res.status().is_continue() {
            log::trace!("< 100 Continue, reading the substantive head");
            continue;
        }
        break res;
    };

    let content_length = framing_header(res.headers(), "Content-Length");
    let transfer_encoding = framing_header(res.headers(), "Transfer-Encoding");

    if content_length.is_some() && transfer_encoding.is_some() {
        return Err(Error::protocol(
            "unexpected Content-Length alongside Transfer-Encoding",
        ));
    }

    // Check for Transfer-Encoding
    if let Some(encoding) = transfer_encoding {
        if encoding
            .split(',')
            .last()
            .map_or(false, |last| last.trim() == "chunked")
        {
            let body_reader = BufReader::new(ChunkedDecoder::new(reader));
            res.set_body(Body::from_reader(body_reader, None));
            return Ok(res);
        }
        // Fall through to Content-Length
    }

    // Check for Content-Length.
    if let Some(len) = content_length {
        let len = len
            .parse::<u64>()
            .map_err(|_| Error::protocol("malformed Content-Length header"))?;
        if len > 0 {
            res.set_body(Body::from_reader(reader.take(len), Some(len)));
        }
    }

    Ok(res)
}

/// Read one head section off the wire and parse it.
async fn decode_head<R>(reader: &mut BufReader<R>) -> Result<Response>
where
    R: AsyncRead + Send + Sync + Unpin + 'static,
{
    let mut buf = Vec::new();
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut httparse_res = httparse::Response::new(&mut headers);

    // Keep reading bytes from the stream until we hit the end of the head.
    loop {
        let bytes_read = reader.read_until(b'\n', &mut buf).await?;
        // No more bytes are yielded from the stream.
        if bytes_read == 0 {
            return Err(Error::protocol("empty response"));
        }

        // Prevent CWE-400 DDOS with large HTTP Headers.
        if buf.len() >= MAX_HEAD_LENGTH {
            return Err(Error::protocol("head byte length should be less than 8kb"));
        }

        // We've hit the end delimiter of the head.
        let idx = buf.len() - 1;
        if idx >= 3 && &buf[idx - 3..=idx] == b"\r\n\r\n" {
            break;
        }
    }

    // Convert our head buf into an httparse instance, and validate.
    let status = httparse_res.parse(&buf).map_err(Error::protocol)?;
    if status.is_partial() {
        return Err(Error::protocol("malformed HTTP head"));
    }

    let code = httparse_res
        .code
        .ok_or_else(|| Error::protocol("no status code found"))?;

    let version = httparse_res
        .version
        .ok_or_else(|| Error::protocol("no version found"))?;
    if version != 1 {
        return Err(Error::protocol("unsupported HTTP version"));
    }

    let mut collection = HeaderCollection::new();
    for header in httparse_res.headers.iter() {
        let value = std::str::from_utf8(header.value)
            .map_err(|_| Error::protocol("header value is not valid utf-8"))?;
        collection.append(header.name, value)?;
    }

    log::trace!("< {} with {} headers", code, collection.len());
    Ok(Response::new(StatusCode::new(code), collection))
}

/// Framing selection follows the RFC: header names compare
/// case-insensitively here even though the collection's own lookup
/// contract is case-sensitive.
fn framing_header<'a>(headers: &'a HeaderCollection, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(token, _)| token.as_str().eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

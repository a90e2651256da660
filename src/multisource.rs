//! A composite readable stream presenting several underlying streams as
//! one continuous byte sequence.
//!
//! Used on the send path to assemble wire payloads -- a length-prefix
//! knot, a JSON segment, a binary payload -- without copying them into a
//! single buffer first.

use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_lite::io::Cursor;
use futures_lite::{AsyncRead, AsyncSeek};

/// A component stream: seekable, readable, and safe to hand across tasks.
pub trait Source: AsyncRead + AsyncSeek + Send + Sync + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Sync + Unpin> Source for T {}

#[derive(Debug)]
struct Component<S> {
    reader: S,
    len: u64,
    pos: u64,
    /// Set when a seek landed before this component; the reader is rewound
    /// lazily when reading reaches it again.
    rewind: bool,
}

/// An ordered list of component streams read as one.
///
/// Total length is the sum of component lengths; reading past the last
/// component yields 0 bytes, never an error. Seeking recomputes which
/// component and in-component offset correspond to the absolute position;
/// seeking past the total length fails.
#[derive(Debug)]
pub struct MultisourcedStream<S = Box<dyn Source>> {
    sources: Vec<Component<S>>,
    current: usize,
    overall: u64,
}

impl<S> Default for MultisourcedStream<S> {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            current: 0,
            overall: 0,
        }
    }
}

impl<S: Source> MultisourcedStream<S> {
    /// Create an empty composite stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component of the given length.
    pub fn push(&mut self, reader: S, len: u64) {
        self.sources.push(Component {
            reader,
            len,
            pos: 0,
            rewind: false,
        });
    }

    /// Sum of component lengths.
    pub fn total_len(&self) -> u64 {
        self.sources.iter().map(|component| component.len).sum()
    }

    /// Absolute position: bytes already consumed across all components.
    pub fn overall_position(&self) -> u64 {
        self.overall
    }
}

impl<S: Source> AsyncRead for MultisourcedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let mut written = 0;

        while written < buf.len() && this.current < this.sources.len() {
            let component = &mut this.sources[this.current];

            if component.rewind {
                match Pin::new(&mut component.reader).poll_seek(cx, SeekFrom::Start(0)) {
                    Poll::Ready(Ok(_)) => {
                        component.rewind = false;
                        component.pos = 0;
                    }
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                    Poll::Pending if written > 0 => return Poll::Ready(Ok(written)),
                    Poll::Pending => return Poll::Pending,
                }
            }

            let wanted = (component.len - component.pos).min((buf.len() - written) as u64) as usize;
            if wanted == 0 {
                this.current += 1;
                continue;
            }

            match Pin::new(&mut component.reader).poll_read(cx, &mut buf[written..written + wanted])
            {
                Poll::Ready(Ok(0)) => {
                    // component shorter than its declared length
                    return Poll::Ready(Err(io::Error::from(io::ErrorKind::UnexpectedEof)));
                }
                Poll::Ready(Ok(n)) => {
                    component.pos += n as u64;
                    this.overall += n as u64;
                    written += n;
                    if component.pos == component.len {
                        this.current += 1;
                    }
                }
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending if written > 0 => return Poll::Ready(Ok(written)),
                Poll::Pending => return Poll::Pending,
            }
        }

        Poll::Ready(Ok(written))
    }
}

impl<S: Source> AsyncSeek for MultisourcedStream<S> {
    fn poll_seek(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        pos: SeekFrom,
    ) -> Poll<io::Result<u64>> {
        let this = self.get_mut();
        let total = this.total_len();

        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(delta) => total as i128 + delta as i128,
            SeekFrom::Current(delta) => this.overall as i128 + delta as i128,
        };
        if target < 0 || target > total as i128 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside composite stream bounds",
            )));
        }
        let target = target as u64;

        // Walk cumulative lengths to find the component holding `target`.
        let mut cumulative = 0u64;
        let mut index = this.sources.len();
        let mut in_component = 0u64;
        for (i, component) in this.sources.iter().enumerate() {
            if target < cumulative + component.len {
                index = i;
                in_component = target - cumulative;
                break;
            }
            cumulative += component.len;
        }

        if index < this.sources.len() {
            match Pin::new(&mut this.sources[index].reader)
                .poll_seek(cx, SeekFrom::Start(in_component))
            {
                Poll::Ready(Ok(_)) => {}
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => return Poll::Pending,
            }
        }

        for (i, component) in this.sources.iter_mut().enumerate() {
            if i < index {
                component.pos = component.len;
                component.rewind = false;
            } else if i == index {
                component.pos = in_component;
                component.rewind = false;
            } else {
                // rewound lazily when reading reaches it
                component.rewind = component.pos != 0;
                component.pos = 0;
            }
        }
        this.current = index.min(this.sources.len());
        this.overall = target;

        Poll::Ready(Ok(target))
    }
}

/// Assemble the application envelope
/// `<decimal-byte-length>\0<json-bytes>[binary-bytes]` as a composite
/// stream: the knot gives the byte length of the JSON segment that
/// follows, so a reader knows exactly where the binary payload begins.
pub fn envelope(
    json: impl Into<Vec<u8>>,
    payload: Option<(Box<dyn Source>, u64)>,
) -> MultisourcedStream<Box<dyn Source>> {
    let json = json.into();
    let knot = format!("{}\0", json.len()).into_bytes();

    let mut stream = MultisourcedStream::new();
    let knot_len = knot.len() as u64;
    let json_len = json.len() as u64;
    stream.push(Box::new(Cursor::new(knot)) as Box<dyn Source>, knot_len);
    stream.push(Box::new(Cursor::new(json)) as Box<dyn Source>, json_len);
    if let Some((reader, len)) = payload {
        stream.push(reader, len);
    }
    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::{AsyncReadExt, AsyncSeekExt};

    fn three_part() -> MultisourcedStream<Cursor<Vec<u8>>> {
        let mut stream = MultisourcedStream::new();
        stream.push(Cursor::new(b"alpha".to_vec()), 5);
        stream.push(Cursor::new(b"beta".to_vec()), 4);
        stream.push(Cursor::new(b"gamma".to_vec()), 5);
        stream
    }

    #[test]
    fn total_length_is_sum_of_parts() {
        assert_eq!(three_part().total_len(), 14);
    }

    #[test]
    fn reads_as_one_continuous_stream() {
        async_std::task::block_on(async move {
            let mut stream = three_part();
            let mut all = Vec::new();
            stream.read_to_end(&mut all).await.unwrap();
            assert_eq!(all, b"alphabetagamma");
            assert_eq!(stream.overall_position(), 14);

            // reading past the end yields 0, never an error
            let mut buf = [0u8; 4];
            assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
        });
    }

    #[test]
    fn chunk_size_does_not_change_the_bytes() {
        async_std::task::block_on(async move {
            let mut one_shot = Vec::new();
            three_part().read_to_end(&mut one_shot).await.unwrap();

            let mut stream = three_part();
            let mut byte_at_a_time = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                match stream.read(&mut byte).await.unwrap() {
                    0 => break,
                    n => byte_at_a_time.extend_from_slice(&byte[..n]),
                }
            }
            assert_eq!(one_shot, byte_at_a_time);
        });
    }

    #[test]
    fn seek_recomputes_component_and_offset() {
        async_std::task::block_on(async move {
            let mut stream = three_part();
            let mut all = Vec::new();
            stream.read_to_end(&mut all).await.unwrap();

            let pos = stream.seek(SeekFrom::Start(7)).await.unwrap();
            assert_eq!(pos, 7);
            assert_eq!(stream.overall_position(), 7);

            let mut rest = Vec::new();
            stream.read_to_end(&mut rest).await.unwrap();
            assert_eq!(rest, b"tagamma");
        });
    }

    #[test]
    fn seek_past_total_length_fails() {
        async_std::task::block_on(async move {
            let mut stream = three_part();
            assert!(stream.seek(SeekFrom::Start(15)).await.is_err());
            assert!(stream.seek(SeekFrom::Current(-1)).await.is_err());
            // exactly-at-end is a valid position
            assert_eq!(stream.seek(SeekFrom::End(0)).await.unwrap(), 14);
        });
    }

    #[test]
    fn envelope_layout() {
        async_std::task::block_on(async move {
            let payload: Box<dyn Source> = Box::new(Cursor::new(vec![0xDE, 0xAD, 0xBE, 0xEF]));
            let mut stream = envelope(br#"{"ok":true}"#.to_vec(), Some((payload, 4)));
            assert_eq!(stream.total_len(), 3 + 11 + 4);

            let mut all = Vec::new();
            stream.read_to_end(&mut all).await.unwrap();
            assert_eq!(&all[..3], b"11\0");
            assert_eq!(&all[3..14], br#"{"ok":true}"#);
            assert_eq!(&all[14..], &[0xDE, 0xAD, 0xBE, 0xEF]);
        });
    }

    #[test]
    fn envelope_without_payload() {
        async_std::task::block_on(async move {
            let mut stream = envelope(b"{}".to_vec(), None);
            let mut all = Vec::new();
            stream.read_to_end(&mut all).await.unwrap();
            assert_eq!(all, b"2\0{}");
        });
    }
}

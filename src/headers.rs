//! Validated header names and the ordered header table.

use std::fmt;

use crate::{Error, Result};

/// RFC 2616 separator characters. A token may not contain any of these,
/// nor any ASCII control character (0..=31) or DEL (127).
const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={} \t";

/// A validated header-name string.
///
/// Immutable once constructed; construction fails with
/// [`Error::InvalidToken`] if the text contains a control or separator
/// character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Validate `text` as an RFC 2616 token.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(Error::InvalidToken(text));
        }
        for byte in text.bytes() {
            if byte <= 31 || byte == 127 || SEPARATORS.contains(&byte) {
                return Err(Error::InvalidToken(text));
            }
        }
        Ok(Token(text))
    }

    /// The validated token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An insertion-ordered table of header name/value pairs.
///
/// Lookup is case-sensitive on the validated token text. Plain string keys
/// are wrapped into a [`Token`] on insertion, so an invalid name fails
/// before any I/O happens.
#[derive(Debug, Clone, Default)]
pub struct HeaderCollection {
    entries: Vec<(Token, String)>,
}

impl HeaderCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the first value stored under `name`. Case-sensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(token, _)| token.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set `name` to `value`, replacing an existing entry with the same
    /// validated text or appending a new one.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let token = Token::new(name)?;
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.as_str() == token.as_str())
        {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((token, value)),
        }
        Ok(())
    }

    /// Append an entry without replacing existing values for the same name.
    pub fn append(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let token = Token::new(name)?;
        self.entries.push((token, value.into()));
        Ok(())
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Token, &str)> {
        self.entries
            .iter()
            .map(|(token, value)| (token, value.as_str()))
    }

    /// Serialize every entry to wire form, `Name: Value\r\n` each.
    pub fn write_wire(&self, buf: &mut Vec<u8>) {
        for (token, value) in self.iter() {
            buf.extend_from_slice(token.as_str().as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_header_names() {
        for name in &["Content-Type", "X-Custom-Header", "ETag", "a", "!#$%&'*+.^_`|~"] {
            assert!(Token::new(*name).is_ok(), "rejected {:?}", name);
        }
    }

    #[test]
    fn rejects_every_separator() {
        for sep in "()<>@,;:\\\"/[]?={} \t".chars() {
            let name = format!("X{}Y", sep);
            assert!(Token::new(name.clone()).is_err(), "accepted {:?}", name);
        }
    }

    #[test]
    fn rejects_control_characters() {
        for byte in (0u8..=31).chain(std::iter::once(127)) {
            let name = format!("X{}Y", byte as char);
            assert!(Token::new(name).is_err(), "accepted control {}", byte);
        }
    }

    #[test]
    fn rejects_empty_token() {
        assert!(Token::new("").is_err());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut headers = HeaderCollection::new();
        headers.insert("Content-Type", "text/plain").unwrap();
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), None);
    }

    #[test]
    fn insert_replaces_append_does_not() {
        let mut headers = HeaderCollection::new();
        headers.insert("Accept", "text/html").unwrap();
        headers.insert("Accept", "application/json").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Accept"), Some("application/json"));

        headers.append("Set-Cookie", "a=1").unwrap();
        headers.append("Set-Cookie", "b=2").unwrap();
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn wire_form() {
        let mut headers = HeaderCollection::new();
        headers.insert("Host", "example.com").unwrap();
        headers.insert("Content-Length", "5").unwrap();

        let mut buf = Vec::new();
        headers.write_wire(&mut buf);
        assert_eq!(buf, b"Host: example.com\r\nContent-Length: 5\r\n");
    }
}

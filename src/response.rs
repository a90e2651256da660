use std::fmt;

use futures_lite::AsyncReadExt;

use crate::{Body, HeaderCollection, Result};

/// A 3-digit HTTP response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    /// Wrap a raw 3-digit code.
    pub(crate) fn new(code: u16) -> Self {
        StatusCode(code)
    }

    /// The raw numeric code.
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether the code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Whether this is a `100 Continue` interim response.
    pub(crate) fn is_continue(&self) -> bool {
        self.0 == 100
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded HTTP response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderCollection,
    body: Body,
}

impl Response {
    pub(crate) fn new(status: StatusCode, headers: HeaderCollection) -> Self {
        Self {
            status,
            headers,
            body: Body::empty(),
        }
    }

    /// The response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    /// Look up a header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Replace the response body.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Take the body out, leaving an empty one behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(&mut self.body, Body::empty())
    }

    /// Read the remaining body to completion and return its bytes.
    pub async fn body_bytes(&mut self) -> Result<Vec<u8>> {
        let mut body = self.take_body();
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes).await?;
        Ok(bytes)
    }

    /// Read the remaining body to completion as a UTF-8 string.
    pub async fn body_string(&mut self) -> Result<String> {
        let bytes = self.body_bytes().await?;
        String::from_utf8(bytes).map_err(crate::Error::protocol)
    }
}

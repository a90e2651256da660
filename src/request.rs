use std::fmt;

use crate::{Body, HeaderCollection, Result};

/// An HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    /// The wire form of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    host: String,
    port: u16,
    target: String,
    headers: HeaderCollection,
    body: Body,
}

impl Request {
    /// Create a request for `target` (an absolute path, optionally with a
    /// query string) against `host:port`.
    pub fn new(method: Method, host: impl Into<String>, port: u16, target: impl Into<String>) -> Self {
        Self {
            method,
            host: host.into(),
            port,
            target: target.into(),
            headers: HeaderCollection::new(),
            body: Body::empty(),
        }
    }

    /// The request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The remote host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The remote port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The request target (path + query).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    /// Set a header, validating the name.
    pub fn insert_header(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.headers.insert(name, value)
    }

    /// Replace the request body.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// The request body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Take the body out, leaving an empty one behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(&mut self.body, Body::empty())
    }
}

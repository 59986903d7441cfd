//! HTTP request and response values exchanged with a `Transport`.
//!
//! # Design
//! Both types are plain owned data. A `Request` stays mutable while the
//! pipeline builds and authorizes it, then is handed to the transport by
//! reference. Headers map a name to an ordered list of values and keep the
//! order in which names were first inserted.

use indexmap::IndexMap;
use url::Url;

/// Header name to ordered header values.
pub type Headers = IndexMap<String, Vec<String>>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: HttpMethod,
    pub uri: Url,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: HttpMethod, uri: Url) -> Self {
        Self {
            method,
            uri,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.add_header(name, [value.into()]);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Append `values` to the header `name`, keeping any values already set.
    pub fn add_header<I>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.headers.entry(name.to_string()).or_default().extend(values);
    }

    /// Values for `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        header_values(&self.headers, name)
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&[String]> {
        header_values(&self.headers, name)
    }
}

fn header_values<'a>(headers: &'a Headers, name: &str) -> Option<&'a [String]> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.as_slice())
}

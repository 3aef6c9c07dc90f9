//! HTTP transport types and per-verb success policies.
//!
//! # Design
//! Requests and responses are described as plain data. A `TransientClient`
//! prepares an `HttpRequest`, executes it, and hands back an `HttpResponse`
//! whose body has already been read in full, so interpretation (status policy,
//! JSON decoding) never touches the network and is easy to test.

use std::fmt;

use url::Url;

use crate::error::{Result, WorkerError};

pub const CONTENT_TYPE: &str = "content-type";
pub const AUTHORIZATION: &str = "authorization";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const JSON_UTF8_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

    /// Punctuation after "operation unsuccessful" in status failures.
    pub(crate) fn failure_mark(self) -> &'static str {
        match self {
            HttpMethod::Delete => "!",
            _ => ".",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is already resolved against the worker's base address.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value with the given (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response with its body fully read as text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Replace whatever content type the server declared with
    /// `application/json`. Some servers omit or mis-set it on JSON bodies.
    pub fn force_json_content_type(&mut self) {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_TYPE));
        self.headers
            .push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
    }

    /// True when there is nothing to deserialize.
    pub fn body_is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// The set of status codes a write operation treats as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    method: HttpMethod,
    accepted: &'static [u16],
}

impl StatusPolicy {
    pub const POST: StatusPolicy = StatusPolicy {
        method: HttpMethod::Post,
        accepted: &[201, 200],
    };

    pub const PUT: StatusPolicy = StatusPolicy {
        method: HttpMethod::Put,
        accepted: &[201, 200, 204],
    };

    pub const DELETE: StatusPolicy = StatusPolicy {
        method: HttpMethod::Delete,
        accepted: &[204, 202],
    };

    pub const DELETE_WITH_RESPONSE: StatusPolicy = StatusPolicy {
        method: HttpMethod::Delete,
        accepted: &[204, 202, 200],
    };

    pub const DELETE_WITH_BODY: StatusPolicy = StatusPolicy {
        method: HttpMethod::Delete,
        accepted: &[204, 202],
    };

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn accepted(&self) -> &'static [u16] {
        self.accepted
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.accepted.contains(&status)
    }

    /// Fail with `UnexpectedStatus` unless `status` is in the success set.
    pub fn check(&self, status: u16) -> Result<()> {
        if self.accepts(status) {
            return Ok(());
        }
        tracing::warn!(method = %self.method, status, "unexpected HTTP status");
        Err(WorkerError::UnexpectedStatus {
            method: self.method,
            status,
        })
    }
}

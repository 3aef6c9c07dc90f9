//! Basic authentication credential.
//!
//! A `Credential` is an immutable pre-encoded token. The worker keeps it behind
//! an `Arc` and replaces the whole value on update, so every transient client
//! works from the snapshot it took at construction.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Pre-encoded basic-auth token sent as `Authorization: Basic <token>`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a token that is already base64 encoded.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Encode `username:password` (UTF-8) as a basic-auth token.
    pub fn basic(username: &str, password: &str) -> Self {
        Self::from_token(BASE64.encode(format!("{username}:{password}")))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .finish()
    }
}

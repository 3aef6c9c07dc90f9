//! Per-operation HTTP client.
//!
//! # Design
//! Every worker operation builds its own `TransientClient`: a fresh
//! `reqwest::Client` bound to the base address plus the credential snapshot
//! taken at construction. Nothing is shared or pooled across operations. The
//! client is owned by the calling future and dropped when it completes, and
//! `execute` consumes the response while reading its body, so connection
//! resources are released on every exit path.

use std::sync::Arc;

use reqwest::header::HeaderValue;
use tracing::{debug, trace};
use url::Url;

use crate::auth::Credential;
use crate::error::{Result, WorkerError};
use crate::http::{
    HttpMethod, HttpRequest, HttpResponse, AUTHORIZATION, CONTENT_TYPE, JSON_UTF8_CONTENT_TYPE,
};

#[derive(Debug)]
pub struct TransientClient {
    http: reqwest::Client,
    base_url: Url,
    credential: Option<Arc<Credential>>,
}

impl TransientClient {
    pub(crate) fn new(
        base_url: Url,
        credential: Option<Arc<Credential>>,
        user_agent: &str,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(WorkerError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            credential,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The credential this client was created with, if any.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_deref()
    }

    /// Resolve `path` against the base address and attach headers.
    ///
    /// Resolution follows RFC 3986: with a base of `https://host/api/`, the
    /// path `repos/1` becomes `https://host/api/repos/1`, while `/repos/1`
    /// replaces the base path entirely.
    pub fn prepare(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
    ) -> Result<HttpRequest> {
        let url = self
            .base_url
            .join(path)
            .map_err(|source| WorkerError::InvalidPath {
                path: path.to_string(),
                source,
            })?;

        let mut headers = Vec::new();
        if let Some(credential) = &self.credential {
            let value = credential.header_value();
            HeaderValue::from_str(&value).map_err(|_| WorkerError::InvalidCredential)?;
            headers.push((AUTHORIZATION.to_string(), value));
        }
        if body.is_some() {
            headers.push((CONTENT_TYPE.to_string(), JSON_UTF8_CONTENT_TYPE.to_string()));
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send `request` and read the whole response body as text.
    ///
    /// The body is decoded with the charset the response declares (UTF-8
    /// when none is given) and a leading byte order mark is dropped.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "HTTP request");

        let mut builder = self.http.request(request.method.into(), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        trace!(status, "HTTP response");

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
    ) -> Result<HttpResponse> {
        let request = self.prepare(method, path, body)?;
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str, credential: Option<Credential>) -> TransientClient {
        TransientClient::new(Url::parse(base).unwrap(), credential.map(Arc::new), "test").unwrap()
    }

    #[test]
    fn relative_path_extends_base_path() {
        let req = client("https://example.com/api/", None)
            .prepare(HttpMethod::Get, "repos/42", None)
            .unwrap();
        assert_eq!(req.url.as_str(), "https://example.com/api/repos/42");
    }

    #[test]
    fn base_without_trailing_slash_drops_last_segment() {
        let req = client("https://example.com/api", None)
            .prepare(HttpMethod::Get, "repos", None)
            .unwrap();
        assert_eq!(req.url.as_str(), "https://example.com/repos");
    }

    #[test]
    fn absolute_path_replaces_base_path() {
        let req = client("https://example.com/api/", None)
            .prepare(HttpMethod::Get, "/rest/status", None)
            .unwrap();
        assert_eq!(req.url.as_str(), "https://example.com/rest/status");
    }

    #[test]
    fn query_string_is_kept() {
        let req = client("https://example.com/api/", None)
            .prepare(HttpMethod::Get, "repos?start=25&limit=25", None)
            .unwrap();
        assert_eq!(req.url.query(), Some("start=25&limit=25"));
    }

    #[test]
    fn unparseable_path_is_rejected() {
        let err = client("https://example.com/api/", None)
            .prepare(HttpMethod::Get, "http://[", None)
            .unwrap_err();
        assert!(matches!(err, WorkerError::InvalidPath { .. }));
    }

    #[test]
    fn no_credential_means_no_authorization_header() {
        let req = client("https://example.com/", None)
            .prepare(HttpMethod::Delete, "repos/1", None)
            .unwrap();
        assert!(req.header(AUTHORIZATION).is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn credential_becomes_basic_header() {
        let req = client("https://example.com/", Some(Credential::basic("admin", "secret")))
            .prepare(HttpMethod::Get, "repos", None)
            .unwrap();
        assert_eq!(req.header("Authorization"), Some("Basic YWRtaW46c2VjcmV0"));
    }

    #[test]
    fn body_sets_json_content_type() {
        let req = client("https://example.com/", None)
            .prepare(HttpMethod::Put, "repos/1", Some("{}".to_string()))
            .unwrap();
        assert_eq!(req.header(CONTENT_TYPE), Some(JSON_UTF8_CONTENT_TYPE));
        assert_eq!(req.body.as_deref(), Some("{}"));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let err = client("https://example.com/", Some(Credential::from_token("abc\ndef")))
            .prepare(HttpMethod::Get, "repos", None)
            .unwrap_err();
        assert!(matches!(err, WorkerError::InvalidCredential));
    }
}

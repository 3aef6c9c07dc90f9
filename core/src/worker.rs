//! The communication worker: authenticated JSON REST calls against one base
//! address.
//!
//! # Design
//! `CommunicationWorker` holds only the base URL, the user agent and an
//! optional credential. Each operation takes a credential snapshot, builds a
//! `TransientClient`, sends one request and interprets the response:
//!
//! | operation              | success statuses | response body          |
//! |------------------------|------------------|------------------------|
//! | `get` / `get_raw`      | not checked      | JSON / text            |
//! | `post`                 | 201, 200         | JSON (same type)       |
//! | `put` / `put_raw`      | 201, 200, 204    | JSON (same type) / text|
//! | `delete`               | 204, 202         | ignored                |
//! | `delete_with_response` | 204, 202, 200    | JSON                   |
//! | `delete_with_body`     | 204, 202         | ignored                |
//!
//! GET passes any status through to deserialization, so an error page that is
//! not JSON surfaces as `Deserialization` rather than `UnexpectedStatus`.
//!
//! `put` and `delete_with_response` accept 204, so an empty body there yields
//! `T::default()`. Everywhere else an empty body is a deserialization failure.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::Credential;
use crate::config::{default_user_agent, WorkerConfig};
use crate::error::{Result, WorkerError};
use crate::http::{HttpMethod, HttpResponse, StatusPolicy};
use crate::transport::TransientClient;

/// Issues authenticated REST requests against a single base endpoint.
///
/// Safe to share across tasks. Replacing the credential affects operations
/// that create their client afterwards; operations already holding a client
/// keep the credential they started with.
#[derive(Debug)]
pub struct CommunicationWorker {
    base_url: Url,
    user_agent: String,
    credential: ArcSwapOption<Credential>,
}

impl CommunicationWorker {
    /// Worker that sends no `Authorization` header.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::build(base_url, None, default_user_agent())
    }

    /// Worker authenticating with a pre-encoded basic-auth token.
    pub fn with_token(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::build(base_url, Some(Credential::from_token(token)), default_user_agent())
    }

    /// Worker authenticating with `username:password`.
    pub fn with_basic_auth(base_url: &str, username: &str, password: &str) -> Result<Self> {
        Self::build(
            base_url,
            Some(Credential::basic(username, password)),
            default_user_agent(),
        )
    }

    pub fn from_config(config: &WorkerConfig) -> Result<Self> {
        Self::build(
            &config.base_url,
            config.credential()?,
            config.user_agent.clone(),
        )
    }

    fn build(base_url: &str, credential: Option<Credential>, user_agent: String) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            user_agent,
            credential: ArcSwapOption::new(credential.map(Arc::new)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Snapshot of the active credential.
    pub fn credential(&self) -> Option<Arc<Credential>> {
        self.credential.load_full()
    }

    /// Replace the credential with a pre-encoded token.
    pub fn set_basic_auth_token(&self, token: impl Into<String>) {
        self.replace_credential(Credential::from_token(token));
    }

    /// Replace the credential with one derived from `username:password`.
    pub fn set_basic_auth(&self, username: &str, password: &str) {
        self.replace_credential(Credential::basic(username, password));
    }

    fn replace_credential(&self, credential: Credential) {
        self.credential.store(Some(Arc::new(credential)));
        debug!(base_url = %self.base_url, "basic authentication replaced");
    }

    /// Create the per-operation client, capturing the current credential.
    pub fn client(&self) -> Result<TransientClient> {
        TransientClient::new(self.base_url.clone(), self.credential(), &self.user_agent)
    }

    /// GET `path` and deserialize the body, whatever the status.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get_raw(path).await?;
        decode_json(&body)
    }

    /// GET `path` and return the body text, whatever the status.
    pub async fn get_raw(&self, path: &str) -> Result<String> {
        let client = self.client()?;
        let mut response = client.send(HttpMethod::Get, path, None).await?;
        response.force_json_content_type();
        Ok(response.body)
    }

    /// POST `data` as JSON and deserialize the response into the same type.
    pub async fn post<T>(&self, path: &str, data: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let body = encode_json(data)?;
        let client = self.client()?;
        let response = client.send(HttpMethod::Post, path, Some(body)).await?;
        StatusPolicy::POST.check(response.status)?;
        decode_json(&response.body)
    }

    /// PUT `data` as JSON, or with no body at all when `data` is `None`.
    pub async fn put<T>(&self, path: &str, data: Option<&T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let body = data.map(|data| encode_json(data)).transpose()?;
        let client = self.client()?;
        let response = client.send(HttpMethod::Put, path, body).await?;
        StatusPolicy::PUT.check(response.status)?;
        decode_json_or_default(&response)
    }

    /// PUT a raw JSON string (or no body) and return the response text.
    pub async fn put_raw(&self, path: &str, data: Option<&str>) -> Result<String> {
        let client = self.client()?;
        let response = client
            .send(HttpMethod::Put, path, data.map(str::to_string))
            .await?;
        StatusPolicy::PUT.check(response.status)?;
        Ok(response.body)
    }

    /// DELETE `path`; the response body is discarded.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let client = self.client()?;
        let response = client.send(HttpMethod::Delete, path, None).await?;
        StatusPolicy::DELETE.check(response.status)
    }

    /// DELETE `path` and deserialize the response body.
    pub async fn delete_with_response<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let client = self.client()?;
        let response = client.send(HttpMethod::Delete, path, None).await?;
        StatusPolicy::DELETE_WITH_RESPONSE.check(response.status)?;
        decode_json_or_default(&response)
    }

    /// DELETE `path` carrying `data` as a JSON body.
    pub async fn delete_with_body<T: Serialize>(&self, path: &str, data: &T) -> Result<()> {
        let body = encode_json(data)?;
        let client = self.client()?;
        let response = client.send(HttpMethod::Delete, path, Some(body)).await?;
        StatusPolicy::DELETE_WITH_BODY.check(response.status)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let invalid = |reason: String| WorkerError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".to_string()));
    }
    Ok(url)
}

fn encode_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    serde_json::to_string(data).map_err(WorkerError::Serialization)
}

fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(WorkerError::Deserialization)
}

fn decode_json_or_default<T: DeserializeOwned + Default>(response: &HttpResponse) -> Result<T> {
    if response.body_is_empty() {
        return Ok(T::default());
    }
    decode_json(&response.body)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::http::AUTHORIZATION;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Repo {
        id: u64,
        name: String,
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn rejects_empty_base_url() {
        let err = CommunicationWorker::new("").unwrap_err();
        assert!(matches!(err, WorkerError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_relative_base_url() {
        assert!(CommunicationWorker::new("api/v1/").is_err());
    }

    #[test]
    fn rejects_base_that_cannot_hold_paths() {
        let err = CommunicationWorker::new("mailto:admin@example.com").unwrap_err();
        assert!(err.to_string().contains("cannot be used as a base"));
    }

    #[test]
    fn new_has_no_credential() {
        let worker = CommunicationWorker::new("https://example.com/api/").unwrap();
        assert!(worker.credential().is_none());
        let req = worker
            .client()
            .unwrap()
            .prepare(HttpMethod::Get, "repos", None)
            .unwrap();
        assert!(req.header(AUTHORIZATION).is_none());
    }

    #[test]
    fn token_and_basic_constructors_agree() {
        let by_token = CommunicationWorker::with_token("https://example.com/", "YWRtaW46c2VjcmV0")
            .unwrap();
        let by_password =
            CommunicationWorker::with_basic_auth("https://example.com/", "admin", "secret").unwrap();
        assert_eq!(by_token.credential(), by_password.credential());
    }

    #[test]
    fn set_basic_auth_replaces_credential() {
        let worker = CommunicationWorker::with_token("https://example.com/", "old").unwrap();
        worker.set_basic_auth("admin", "secret");
        assert_eq!(
            worker.credential().unwrap().header_value(),
            "Basic YWRtaW46c2VjcmV0"
        );
        worker.set_basic_auth_token("bmV3");
        assert_eq!(worker.credential().unwrap().token(), "bmV3");
    }

    #[test]
    fn client_keeps_credential_from_construction() {
        let worker = CommunicationWorker::with_basic_auth("https://example.com/", "alice", "a").unwrap();
        let client = worker.client().unwrap();
        worker.set_basic_auth("bob", "b");

        let before = client.prepare(HttpMethod::Get, "repos", None).unwrap();
        assert_eq!(
            before.header(AUTHORIZATION),
            Some(Credential::basic("alice", "a").header_value().as_str())
        );

        let after = worker
            .client()
            .unwrap()
            .prepare(HttpMethod::Get, "repos", None)
            .unwrap();
        assert_eq!(
            after.header(AUTHORIZATION),
            Some(Credential::basic("bob", "b").header_value().as_str())
        );
    }

    #[test]
    fn from_config_uses_user_agent_and_credential() {
        let config = WorkerConfig::new("https://example.com/api/")
            .with_token("dG9rZW4=")
            .with_user_agent("sync-job/1.0");
        let worker = CommunicationWorker::from_config(&config).unwrap();
        assert_eq!(worker.user_agent, "sync-job/1.0");
        assert_eq!(worker.credential().unwrap().token(), "dG9rZW4=");
        assert_eq!(worker.base_url().as_str(), "https://example.com/api/");
    }

    #[test]
    fn worker_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommunicationWorker>();
    }

    #[test]
    fn decode_json_reads_typed_body() {
        let repo: Repo = decode_json(r#"{"id":42,"name":"demo"}"#).unwrap();
        assert_eq!(
            repo,
            Repo {
                id: 42,
                name: "demo".to_string()
            }
        );
    }

    #[test]
    fn decode_json_rejects_empty_body() {
        let err = decode_json::<Repo>("").unwrap_err();
        assert!(matches!(err, WorkerError::Deserialization(_)));
    }

    #[test]
    fn empty_no_content_body_yields_default() {
        let repo: Repo = decode_json_or_default(&response(204, "")).unwrap();
        assert_eq!(repo, Repo::default());
    }

    #[test]
    fn non_empty_body_is_still_decoded() {
        let repo: Repo = decode_json_or_default(&response(200, r#"{"id":7,"name":"x"}"#)).unwrap();
        assert_eq!(repo.id, 7);
        assert!(decode_json_or_default::<Repo>(&response(200, "<html>")).is_err());
    }

    #[test]
    fn encode_json_serializes_payload() {
        let body = encode_json(&Repo {
            id: 1,
            name: "core".to_string(),
        })
        .unwrap();
        assert_eq!(body, r#"{"id":1,"name":"core"}"#);
    }
}

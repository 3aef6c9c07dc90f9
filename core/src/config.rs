//! Worker configuration.
//!
//! Describes how to construct a `CommunicationWorker`: the base address, an
//! optional credential and the user agent. Values come from code, from any
//! serde source, or from `STASH_*` environment variables.

use serde::{Deserialize, Serialize};

use crate::auth::Credential;
use crate::error::{Result, WorkerError};

pub const ENV_BASE_URL: &str = "STASH_BASE_URL";
pub const ENV_TOKEN: &str = "STASH_TOKEN";
pub const ENV_USERNAME: &str = "STASH_USERNAME";
pub const ENV_PASSWORD: &str = "STASH_PASSWORD";
pub const ENV_USER_AGENT: &str = "STASH_USER_AGENT";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerConfig {
    pub base_url: String,

    /// Pre-encoded basic-auth token. Takes precedence over username/password.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl WorkerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            username: None,
            password: None,
            user_agent: default_user_agent(),
        }
    }

    /// Read configuration from the `STASH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = get(ENV_BASE_URL)
            .ok_or_else(|| WorkerError::Config(format!("{ENV_BASE_URL} is not set")))?;

        let mut config = Self::new(base_url);
        config.token = get(ENV_TOKEN);
        config.username = get(ENV_USERNAME);
        config.password = get(ENV_PASSWORD);
        if let Some(user_agent) = get(ENV_USER_AGENT) {
            config.user_agent = user_agent;
        }

        config.credential()?;
        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolve the configured credential, if any.
    pub fn credential(&self) -> Result<Option<Credential>> {
        if let Some(token) = &self.token {
            return Ok(Some(Credential::from_token(token.clone())));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Some(Credential::basic(username, password))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(WorkerError::Config(
                "username is set but password is missing".to_string(),
            )),
            (None, Some(_)) => Err(WorkerError::Config(
                "password is set but username is missing".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

pub(crate) fn default_user_agent() -> String {
    format!("stash-core/{}", env!("CARGO_PKG_VERSION"))
}

//! Asynchronous JSON REST communication core for Stash-style APIs.
//!
//! # Overview
//! `CommunicationWorker` issues authenticated GET/POST/PUT/DELETE requests
//! against one base address, (de)serializes JSON payloads and turns HTTP
//! outcomes into values or `WorkerError`s. Resource-specific code supplies
//! relative paths and payload types; this crate knows nothing about them.
//!
//! # Design
//! - The worker holds only its base URL, user agent and an optional basic-auth
//!   `Credential` behind an atomically swapped `Arc`.
//! - Every operation builds a `TransientClient` (a fresh `reqwest::Client`
//!   plus credential snapshot) that is dropped when the operation finishes.
//! - Requests and responses pass through plain-data `HttpRequest` /
//!   `HttpResponse` values so preparation and interpretation are testable
//!   without a server.
//! - Write operations enforce a per-verb `StatusPolicy`; GET does not.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod worker;

pub use auth::Credential;
pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, StatusPolicy};
pub use transport::TransientClient;
pub use worker::CommunicationWorker;

//! HTTP client for the events backend.
//!
//! Every operation goes through [`ApiClient::send`], which attaches the bearer
//! token for protected endpoints and turns non-success responses into
//! [`ApiError`]s carrying the backend's `message`.

mod auth;
mod errors;
mod events;
pub mod types;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::session::SessionHandle;
pub use errors::{ApiError, ApiErrorKind};
pub use events::{ALL_CATEGORIES, EventQuery};

/// Standard User-Agent header for eventdeck requests.
pub const USER_AGENT: &str = concat!("eventdeck/", env!("CARGO_PKG_VERSION"));

/// Whether an endpoint needs the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
}

/// A single backend call.
struct Request<'a, B: ?Sized> {
    method: Method,
    segments: &'a [&'a str],
    query: &'a [(&'a str, &'a str)],
    body: Option<&'a B>,
    access: Access,
    /// Message used when the backend gives none.
    fallback: &'static str,
}

/// Backend client. Cheap to clone; reads the token from a [`SessionHandle`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: url::Url,
    http: reqwest::Client,
    session: SessionHandle,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client can't be built.
    pub fn new(base_url: &str, timeout: Option<Duration>, session: SessionHandle) -> Result<Self> {
        let base_url = url::Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry paths: {base_url}");
        }

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;

        Ok(Self {
            base_url,
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url_for(&self, segments: &[&str]) -> url::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<B, T>(&self, req: Request<'_, B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // Checked before building the request so nothing goes on the wire.
        let token = match req.access {
            Access::Authenticated => Some(self.session.token().ok_or_else(ApiError::auth_required)?),
            Access::Public => None,
        };

        let url = self.url_for(req.segments);
        let mut builder = self.http.request(req.method.clone(), url.clone());
        if !req.query.is_empty() {
            builder = builder.query(req.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = req.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %req.method, path = url.path(), "sending request");
        let response = builder.send().await.map_err(|err| {
            tracing::warn!(method = %req.method, path = url.path(), error = %err, "request failed");
            ApiError::network(&err)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| ApiError::network(&err))?;
        tracing::debug!(method = %req.method, path = url.path(), status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(ApiError::http_status(status.as_u16(), &body, req.fallback));
        }

        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(ApiError::parse)
    }
}

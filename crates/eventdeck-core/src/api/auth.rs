//! `/api/auth/*` endpoints.

use reqwest::Method;

use super::types::{AuthResponse, Credentials, ExternalIdentity, MeResponse, Registration, User};
use super::{Access, ApiClient, ApiError, Request};

impl ApiClient {
    /// `POST /api/auth/register`
    ///
    /// # Errors
    /// Returns the backend's message on a non-success status.
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        self.send(Request {
            method: Method::POST,
            segments: &["api", "auth", "register"],
            query: &[],
            body: Some(registration),
            access: Access::Public,
            fallback: "Registration failed",
        })
        .await
    }

    /// `POST /api/auth/login`
    ///
    /// # Errors
    /// Returns the backend's message on a non-success status.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.send(Request {
            method: Method::POST,
            segments: &["api", "auth", "login"],
            query: &[],
            body: Some(credentials),
            access: Access::Public,
            fallback: "Login failed",
        })
        .await
    }

    /// `POST /api/auth/oauth`: idempotent upsert of a provider identity.
    ///
    /// # Errors
    /// Returns the backend's message on a non-success status.
    pub async fn oauth_upsert(&self, identity: &ExternalIdentity) -> Result<AuthResponse, ApiError> {
        self.send(Request {
            method: Method::POST,
            segments: &["api", "auth", "oauth"],
            query: &[],
            body: Some(identity),
            access: Access::Public,
            fallback: "OAuth sign-in failed",
        })
        .await
    }

    /// `GET /api/auth/me`
    ///
    /// # Errors
    /// `AuthRequired` without a token; `AuthRejected` if the backend refuses it.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let response: MeResponse = self
            .send(Request::<()> {
                method: Method::GET,
                segments: &["api", "auth", "me"],
                query: &[],
                body: None,
                access: Access::Authenticated,
                fallback: "Failed to get user",
            })
            .await?;
        Ok(response.user)
    }
}

//! Session state and the coordinator that owns it.
//!
//! [`SessionContext`] is the only writer of the current session and is owned
//! by [`SessionCoordinator`]. Everything else reads through a cloneable
//! [`SessionHandle`].
//!
//! State machine:
//!
//! ```text
//! Anonymous --login/register/oauth--> Pending --ok--> Authenticated
//!                                        |
//!                                        +--err--> previous state
//! Authenticated --logout--> Anonymous
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};

use crate::api::types::{AuthResponse, Credentials, ExternalIdentity, Registration, User};
use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::config::OAuthStrategy;
use crate::token_store::{StoredSession, TokenStore};

/// Authenticated identity plus its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            user: stored.user,
            token: stored.token,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Pending,
    Authenticated(Session),
}

/// Writable session cell. Not `Clone`: there is exactly one writer.
#[derive(Debug, Default)]
pub struct SessionContext {
    state: Arc<RwLock<SessionState>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view sharing this context's state.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Replaces the state, returning the previous one.
    fn replace(&self, next: SessionState) -> SessionState {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}

/// Read-only accessor for the current session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: Arc<RwLock<SessionState>>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current(&self) -> Option<Session> {
        match self.state() {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous | SessionState::Pending => None,
        }
    }

    /// Bearer token when authenticated.
    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }
}

/// Runs every sign-in flow and is the single writer of session state.
pub struct SessionCoordinator {
    context: SessionContext,
    api: ApiClient,
    store: Box<dyn TokenStore>,
    strategy: OAuthStrategy,
    legacy_password: String,
}

impl SessionCoordinator {
    pub fn new(
        context: SessionContext,
        api: ApiClient,
        store: Box<dyn TokenStore>,
        strategy: OAuthStrategy,
        legacy_password: impl Into<String>,
    ) -> Self {
        Self {
            context,
            api,
            store,
            strategy,
            legacy_password: legacy_password.into(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.context.handle()
    }

    /// Restores the persisted session without contacting the backend.
    ///
    /// An expired token is only discovered on the next authenticated request.
    /// An unreadable store leaves the session `Anonymous`; `logout` still
    /// clears it.
    pub fn hydrate(&self) -> Option<Session> {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable stored session");
                None
            }
        };
        let session = stored.map(Session::from);
        let next = match &session {
            Some(session) => SessionState::Authenticated(session.clone()),
            None => SessionState::Anonymous,
        };
        self.context.replace(next);
        tracing::debug!(authenticated = session.is_some(), "session hydrated");
        session
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    /// `ApiError` (`AuthRejected` for bad credentials) or a storage error.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let previous = self.context.replace(SessionState::Pending);
        let result = self.api.login(&credentials).await;
        self.finish(previous, result, "Invalid credentials")
    }

    /// Creates an account and signs in with it.
    ///
    /// # Errors
    /// `ApiError` from the backend or a storage error.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Session> {
        let registration = Registration {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let previous = self.context.replace(SessionState::Pending);
        let result = self.api.register(&registration).await;
        self.finish(previous, result, "Registration failed")
    }

    /// Turns an identity asserted by an OAuth provider into a backend session.
    ///
    /// # Errors
    /// `ApiError` from the backend or a storage error.
    pub async fn sign_in_with_provider(&self, identity: &ExternalIdentity) -> Result<Session> {
        let previous = self.context.replace(SessionState::Pending);
        let result = match self.strategy {
            OAuthStrategy::Upsert => self.api.oauth_upsert(identity).await,
            OAuthStrategy::Legacy => self.legacy_provider_sign_in(identity).await,
        };
        self.finish(previous, result, "OAuth sign-in failed")
    }

    /// Register with a throwaway password; if the account exists, log in with
    /// the provider sentinel password.
    async fn legacy_provider_sign_in(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<AuthResponse, ApiError> {
        let registration = Registration {
            name: identity.name.clone(),
            email: identity.email.clone(),
            password: uuid::Uuid::new_v4().simple().to_string(),
        };
        match self.api.register(&registration).await {
            Ok(response) if response.success && response.token.is_some() => Ok(response),
            Ok(_) => self.legacy_login(identity).await,
            Err(err)
                if matches!(err.kind, ApiErrorKind::HttpStatus | ApiErrorKind::AuthRejected) =>
            {
                tracing::debug!(status = ?err.status, "registration refused, falling back to login");
                self.legacy_login(identity).await
            }
            Err(err) => Err(err),
        }
    }

    async fn legacy_login(&self, identity: &ExternalIdentity) -> Result<AuthResponse, ApiError> {
        let credentials = Credentials {
            email: identity.email.clone(),
            password: self.legacy_password.clone(),
        };
        self.api.login(&credentials).await
    }

    /// Completes a pending attempt: persist and authenticate, or roll back.
    fn finish(
        &self,
        previous: SessionState,
        result: Result<AuthResponse, ApiError>,
        rejected_message: &str,
    ) -> Result<Session> {
        let session = match result.and_then(|resp| session_from_response(resp, rejected_message)) {
            Ok(session) => session,
            Err(err) => {
                self.context.replace(previous);
                tracing::info!(kind = %err.kind, "sign-in failed");
                return Err(err.into());
            }
        };

        let stored = StoredSession {
            token: session.token.clone(),
            user: session.user.clone(),
        };
        if let Err(err) = self.store.save(&stored) {
            self.context.replace(previous);
            return Err(err.context("persist session"));
        }

        self.context
            .replace(SessionState::Authenticated(session.clone()));
        tracing::info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    /// Asks the backend who the stored token belongs to.
    ///
    /// # Errors
    /// `AuthRequired` when signed out, `AuthRejected` when the token is refused.
    pub async fn verify(&self) -> Result<User, ApiError> {
        self.api.current_user().await
    }

    /// Clears the stored token and returns to `Anonymous`.
    /// Returns whether a session was stored.
    ///
    /// # Errors
    /// Returns an error if the token store can't be cleared.
    pub fn logout(&self) -> Result<bool> {
        let had_session = self.store.clear().context("clear stored session")?;
        self.context.replace(SessionState::Anonymous);
        tracing::info!(had_session, "signed out");
        Ok(had_session)
    }
}

fn session_from_response(resp: AuthResponse, rejected_message: &str) -> Result<Session, ApiError> {
    if !resp.success {
        return Err(ApiError::auth_rejected(
            resp.message.unwrap_or_else(|| rejected_message.to_string()),
        ));
    }
    let token = resp
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::parse("response has no token"))?;
    let user = resp
        .user
        .ok_or_else(|| ApiError::parse("response has no user"))?;
    Ok(Session { user, token })
}

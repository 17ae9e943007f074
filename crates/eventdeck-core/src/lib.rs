//! Client library for the eventdeck events backend (config, session, API, views).

pub mod api;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod manage;
pub mod oauth;
pub mod session;
pub mod token_store;

use anyhow::Result;

use crate::api::ApiClient;
use crate::config::Config;
use crate::session::{SessionContext, SessionCoordinator, SessionHandle};
use crate::token_store::{FileTokenStore, TokenStore};

/// Everything a command needs, wired once at startup.
pub struct App {
    pub config: Config,
    pub api: ApiClient,
    pub session: SessionCoordinator,
}

impl App {
    /// Builds the app from config with the default session file, then
    /// restores any persisted session.
    ///
    /// # Errors
    /// Returns an error for an invalid base URL.
    pub fn from_config(config: Config) -> Result<Self> {
        Self::with_store(config, Box::new(FileTokenStore::default_location()))
    }

    /// Same as [`App::from_config`] with a caller-supplied token store.
    ///
    /// # Errors
    /// Returns an error for an invalid base URL.
    pub fn with_store(config: Config, store: Box<dyn TokenStore>) -> Result<Self> {
        let context = SessionContext::new();
        let base_url = config.api_base_url()?;
        let api = ApiClient::new(&base_url, config.request_timeout(), context.handle())?;
        let session = SessionCoordinator::new(
            context,
            api.clone(),
            store,
            config.oauth.strategy,
            config.oauth.legacy_password.clone(),
        );
        session.hydrate();

        Ok(Self {
            config,
            api,
            session,
        })
    }

    pub fn session_handle(&self) -> SessionHandle {
        self.session.handle()
    }
}

use std::sync::Arc;

// --- Module Structure ---

// Session and authorization core.
pub mod auth;
pub mod guard;
pub mod storage;

// Backend access.
pub mod client;
pub mod content;
pub mod models;

// Forms and screen state.
pub mod validation;
pub mod views;

pub mod config;
pub mod error;

// --- Public Re-exports ---

pub use auth::{Session, SessionManager};
pub use client::{ApiClient, AuthApi, AuthApiState};
pub use config::{AppConfig, Env};
pub use content::{Attachment, Content, ContentForm, ContentKind};
pub use error::{ApiError, AuthError, ConfigError, StartupError, StorageError, ValidationError};
pub use guard::GuardDecision;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageState};

/// AppState
///
/// Everything a front-end needs, wired once at start-up: the immutable
/// configuration, the API client and the single session owner. Views borrow
/// `client` and `session` per call instead of reaching for globals.
pub struct AppState {
    pub config: AppConfig,
    pub client: ApiClient,
    pub session: SessionManager,
}

impl AppState {
    /// Assembles the state around an explicit storage backend.
    pub fn new(config: AppConfig, storage: StorageState) -> Result<Self, StartupError> {
        let client = ApiClient::new(&config)?;
        let api: AuthApiState = Arc::new(client.clone());
        let session = SessionManager::new(api, storage);
        Ok(Self {
            config,
            client,
            session,
        })
    }

    /// bootstrap
    ///
    /// Builds the state with the on-disk session store named in the config,
    /// then restores any persisted session. Runs once per process.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, StartupError> {
        let storage: StorageState = Arc::new(FileStorage::new(config.session_store_path.clone()));
        let mut state = Self::new(config, storage)?;
        state.session.restore_session().await?;
        tracing::debug!(
            base_url = %state.client.base_url(),
            authenticated = state.session.is_authenticated(),
            "client state ready"
        );
        Ok(state)
    }

    /// Route guard over this state's session.
    pub fn guard(&self, path: &str) -> GuardDecision {
        guard::check_path(path, &self.session)
    }
}

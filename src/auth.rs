use std::fmt;

use crate::{
    client::AuthApiState,
    error::{AuthError, StorageError},
    models::{AuthResponse, Credentials, User},
    storage::StorageState,
};

/// Persisted key holding the serialized `User`.
pub const USER_KEY: &str = "user";
/// Persisted key holding the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Key written by older clients. Never written here, only cleared on logout.
pub const LEGACY_TOKEN_KEY: &str = "authToken";

/// Session
///
/// The authenticated identity held by the client. Can only be built through
/// `Session::new`, which rejects an empty token or identity, so a `Session`
/// in hand is always complete.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    user: User,
    token: String,
}

impl Session {
    /// Returns `None` for a partial session: empty token or empty email.
    pub fn new(user: User, token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() || user.email.trim().is_empty() {
            return None;
        }
        Some(Self { user, token })
    }

    /// Builds a session from a login response. Token, email and role must all
    /// be present and non-empty; the missing piece is named otherwise.
    pub fn from_login(response: AuthResponse) -> Result<Self, AuthError> {
        let token = non_empty(response.token).ok_or(AuthError::MalformedResponse("token"))?;
        let email = non_empty(response.email).ok_or(AuthError::MalformedResponse("email"))?;
        let role = non_empty(response.role).ok_or(AuthError::MalformedResponse("role"))?;
        let user = User {
            id: email.clone(),
            email,
            role,
        };
        Session::new(user, token).ok_or(AuthError::MalformedResponse("token"))
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn identity(&self) -> &str {
        &self.user.email
    }

    pub fn role(&self) -> &str {
        &self.user.role
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_admin(&self) -> bool {
        is_admin_role(&self.user.role)
    }
}

// Tokens stay out of logs and panic messages.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// The authorization decision: role equals "admin", ignoring case.
pub fn is_admin_role(role: &str) -> bool {
    role.to_lowercase() == "admin"
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// SessionManager
///
/// Owns the current session and the persisted copy of it. Mutating
/// operations take `&mut self`, so there is exactly one writer; everything
/// that only needs to read the session borrows `&SessionManager`.
///
/// The manager never re-validates a token with the server. A stale token is
/// discovered by the backend rejecting the next authenticated call.
pub struct SessionManager {
    api: AuthApiState,
    storage: StorageState,
    current: Option<Session>,
}

impl SessionManager {
    /// Creates a manager with no session. Call `restore_session` once at
    /// start-up to adopt a persisted one.
    pub fn new(api: AuthApiState, storage: StorageState) -> Self {
        Self {
            api,
            storage,
            current: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(Session::user)
    }

    /// Bearer token for API calls; `None` when logged out.
    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(Session::token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.current.as_ref().is_some_and(Session::is_admin)
    }

    /// login
    ///
    /// Posts the credentials and, if the response carries a token, an email
    /// and a role, adopts and persists the new session (`user` then `token`).
    /// Any other outcome leaves both memory and storage untouched.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Session, AuthError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self.api.login(&credentials).await?;
        let session = Session::from_login(response).inspect_err(|e| {
            tracing::warn!(%email, error = %e, "login response rejected");
        })?;

        self.persist(&session).await?;
        tracing::info!(email = %session.identity(), admin = session.is_admin(), "logged in");
        let session = self.current.insert(session);
        Ok(&*session)
    }

    /// signup
    ///
    /// Forwards the credentials to the registration endpoint. No session is
    /// established; the caller logs in afterwards.
    pub async fn signup(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let reply = self.api.signup(&credentials).await?;
        tracing::info!(%email, "account registered");
        Ok(reply)
    }

    /// logout
    ///
    /// Drops the in-memory session and removes every persisted key:
    /// `user` and `token` first, then the legacy `authToken`. Safe to call
    /// when logged out.
    ///
    /// The in-memory session is always cleared. Every key removal is
    /// attempted even if an earlier one fails; the first failure is returned
    /// once all of them have been tried.
    pub async fn logout(&mut self) -> Result<(), StorageError> {
        if let Some(session) = self.current.take() {
            tracing::info!(email = %session.identity(), "logged out");
        }
        let mut first_error = None;
        for key in [USER_KEY, TOKEN_KEY, LEGACY_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                tracing::warn!(key, error = %e, "failed to clear persisted key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// restore_session
    ///
    /// Adopts the persisted session, if any, without contacting the server.
    /// A missing `user` key means logged out. A `user` that does not parse,
    /// or one without a matching `token`, is treated as absent.
    pub async fn restore_session(&mut self) -> Result<Option<&Session>, StorageError> {
        self.current = None;

        let Some(raw_user) = self.storage.get(USER_KEY).await? else {
            tracing::debug!("no persisted session");
            return Ok(None);
        };

        let user: User = match serde_json::from_str(&raw_user) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "persisted user is unreadable; ignoring it");
                return Ok(None);
            }
        };

        let token = self.storage.get(TOKEN_KEY).await?.unwrap_or_default();
        match Session::new(user, token) {
            Some(session) => {
                tracing::info!(email = %session.identity(), "session restored");
                let session = self.current.insert(session);
                Ok(Some(&*session))
            }
            None => {
                tracing::warn!("persisted session is incomplete; ignoring it");
                Ok(None)
            }
        }
    }

    /// persist
    ///
    /// Writes `user` then `token`. If the token write fails, the `user` key
    /// is put back to what it held before (or removed if it was empty), so
    /// storage keeps matching the session that stays in memory.
    async fn persist(&self, session: &Session) -> Result<(), AuthError> {
        let user_json = serde_json::to_string(session.user()).map_err(StorageError::from)?;
        let previous_user = self.storage.get(USER_KEY).await?;
        self.storage.set(USER_KEY, &user_json).await?;
        if let Err(e) = self.storage.set(TOKEN_KEY, session.token()).await {
            let rollback = match &previous_user {
                Some(previous) => self.storage.set(USER_KEY, previous).await,
                None => self.storage.remove(USER_KEY).await,
            };
            if let Err(rollback_err) = rollback {
                tracing::warn!(error = %rollback_err, "could not roll back persisted user");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

//! View state for the screens that talk to the backend.
//!
//! Each view keeps the last good data, a single error line and nothing else.
//! A failed call only sets the error; previously loaded data stays as it was.

use crate::{
    auth::SessionManager,
    client::ApiClient,
    content::{Content, ContentForm},
    error::{ApiError, AuthError},
    models::BroadcastRequest,
    validation,
};

pub const SIGNUP_FALLBACK: &str = "Signup failed. Please try again.";
pub const LOGIN_FALLBACK: &str = "Login failed. Please check your credentials.";
pub const BROADCAST_FAILED: &str = "Failed to send broadcast email";

/// RequestId
///
/// Monotonic per-view ticket for list refreshes. Only the response to the
/// most recently issued ticket is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Which screen a list belongs to; only changes the wording of the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Public pages: "Failed to load departments".
    Public,
    /// Admin management screens: "Failed to fetch departments".
    Admin,
}

/// ListView
///
/// A list of one content kind plus the admin actions on it.
pub struct ListView<T: Content> {
    audience: Audience,
    items: Vec<T>,
    error: Option<String>,
    loading: bool,
    issued: u64,
}

impl<T: Content> ListView<T> {
    pub fn new(audience: Audience) -> Self {
        Self {
            audience,
            items: Vec::new(),
            error: None,
            loading: false,
            issued: 0,
        }
    }

    pub fn public() -> Self {
        Self::new(Audience::Public)
    }

    pub fn admin() -> Self {
        Self::new(Audience::Admin)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn fetch_failed(&self) -> String {
        let verb = match self.audience {
            Audience::Public => "load",
            Audience::Admin => "fetch",
        };
        format!("Failed to {verb} {}", T::KIND.plural())
    }

    /// Issues a new ticket. Any response to an older ticket will be dropped.
    pub fn begin_refresh(&mut self) -> RequestId {
        self.issued += 1;
        self.loading = true;
        RequestId(self.issued)
    }

    /// Applies a list response if `id` is still the latest ticket. Returns
    /// whether it was applied.
    pub fn apply_refresh(&mut self, id: RequestId, result: Result<Vec<T>, ApiError>) -> bool {
        if id.0 != self.issued {
            tracing::debug!(kind = %T::KIND, stale = id.0, latest = self.issued, "dropping stale list response");
            return false;
        }
        self.loading = false;
        match result {
            Ok(items) => self.items = items,
            Err(e) => {
                tracing::warn!(kind = %T::KIND, error = %e, "list refresh failed");
                self.error = Some(self.fetch_failed());
            }
        }
        true
    }

    /// refresh
    ///
    /// Fetches the full list with the session's token (if any) and applies
    /// it through `apply_refresh`. A failure sets the audience-specific
    /// error and leaves the previous items in place.
    pub async fn refresh(&mut self, client: &ApiClient, session: &SessionManager) {
        let id = self.begin_refresh();
        let result = client.list::<T>(session.token()).await;
        self.apply_refresh(id, result);
    }

    /// Creates (`editing == None`) or updates an item, then reloads the list.
    /// Returns true on success.
    pub async fn save(
        &mut self,
        client: &ApiClient,
        session: &SessionManager,
        editing: Option<i64>,
        form: ContentForm,
    ) -> bool {
        self.error = None;
        if let Err(e) = form.validate() {
            self.error = Some(e.to_string());
            return false;
        }

        let result = match editing {
            Some(id) => client.update::<T>(id, form, session.token()).await,
            None => client.create::<T>(form, session.token()).await,
        };
        match result {
            Ok(_) => {
                self.refresh(client, session).await;
                true
            }
            Err(e) => {
                tracing::warn!(kind = %T::KIND, ?editing, error = %e, "save failed");
                self.error = Some(format!("Failed to save {}", T::KIND.singular()));
                false
            }
        }
    }

    /// Deletes an item, then reloads the list. On failure the list is left
    /// exactly as it was.
    pub async fn delete(&mut self, client: &ApiClient, session: &SessionManager, id: i64) -> bool {
        match client.delete(T::KIND, id, session.token()).await {
            Ok(()) => {
                self.refresh(client, session).await;
                true
            }
            Err(e) => {
                tracing::warn!(kind = %T::KIND, id, error = %e, "delete failed");
                self.error = Some(format!("Failed to delete {}", T::KIND.singular()));
                false
            }
        }
    }
}

/// BroadcastView
///
/// The admin email composer. A successful send clears the draft and shows
/// the backend's confirmation text.
#[derive(Debug, Default)]
pub struct BroadcastView {
    pub subject: String,
    pub body: String,
    error: Option<String>,
    success: Option<String>,
}

impl BroadcastView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    /// Resets the draft and both messages.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub async fn submit(&mut self, client: &ApiClient, session: &SessionManager) -> bool {
        self.error = None;
        self.success = None;

        let request = BroadcastRequest {
            subject: self.subject.clone(),
            body: self.body.clone(),
        };
        if let Err(e) = validation::validate_broadcast(&request) {
            self.error = Some(e.to_string());
            return false;
        }

        match client.broadcast_email(&request, session.token()).await {
            Ok(reply) => {
                self.success = Some(reply);
                self.subject.clear();
                self.body.clear();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "broadcast failed");
                self.error = Some(BROADCAST_FAILED.to_string());
                false
            }
        }
    }
}

/// SignupView
///
/// Registration form. Validation runs first and short-circuits; backend
/// failures show the server's message when there is one.
#[derive(Default)]
pub struct SignupView {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    error: Option<String>,
    success: bool,
}

impl SignupView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True once the account was created; the caller moves on to login.
    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub async fn submit(&mut self, session: &SessionManager) -> bool {
        self.error = None;

        let outcome = match validation::validate_signup(
            &self.email,
            &self.password,
            &self.confirm_password,
        ) {
            Err(e) => Err(AuthError::from(e)),
            Ok(()) => session.signup(&self.email, &self.password).await.map(|_| ()),
        };

        match outcome {
            Ok(()) => {
                self.success = true;
                true
            }
            Err(e) => {
                self.error = Some(e.user_message(SIGNUP_FALLBACK));
                false
            }
        }
    }
}

/// LoginView
///
/// Login form. Empty fields are rejected locally; otherwise the session
/// manager is asked to log in. On success the password is wiped from the
/// form, and on failure the server's message (or `LOGIN_FALLBACK`) is kept
/// for display while the previous session stays as it was.
#[derive(Default)]
pub struct LoginView {
    pub email: String,
    pub password: String,
    error: Option<String>,
}

impl LoginView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn submit(&mut self, session: &mut SessionManager) -> bool {
        self.error = None;

        let outcome = match validation::validate_login(&self.email, &self.password) {
            Err(e) => Err(AuthError::from(e)),
            Ok(()) => session.login(&self.email, &self.password).await.map(|_| ()),
        };

        match outcome {
            Ok(()) => {
                self.password.clear();
                true
            }
            Err(e) => {
                self.error = Some(e.user_message(LOGIN_FALLBACK));
                false
            }
        }
    }
}

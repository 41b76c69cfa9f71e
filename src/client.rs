use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, header::HeaderName};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    content::{Content, ContentForm, ContentKind, Lookup},
    error::ApiError,
    models::{AuthResponse, BroadcastRequest, Credentials, Event},
};

/// Header used to correlate a client call with the backend's request logs.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest plain-text body accepted as a human-readable error message.
const MAX_PLAIN_MESSAGE_LEN: usize = 200;

/// AuthApi
///
/// The two unauthenticated endpoints the session manager depends on. Kept as
/// a trait so the session logic can be exercised against a stub without a
/// running backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`. The body's shape is not checked here.
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    /// `POST /auth/signup`. Returns whatever text the backend answered with.
    async fn signup(&self, credentials: &Credentials) -> Result<String, ApiError>;
}

/// AuthApiState
///
/// The shared handle injected into the session manager.
pub type AuthApiState = Arc<dyn AuthApi>;

/// ApiClient
///
/// Thin wrapper over the REST backend. Every method is one request: a
/// bearer token is attached iff `auth` is `Some`, any non-2xx status becomes
/// `ApiError::Status`, and nothing is retried.
///
/// Calls are independent; two in flight at once are not ordered against
/// each other.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Builds the HTTP client from the loaded configuration.
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(config.api_base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- Request plumbing ---

    /// request
    ///
    /// Starts a request against `base_url + path`. The `Authorization:
    /// Bearer` header is added only when `auth` carries a token; anonymous
    /// calls go out without it.
    fn request(&self, method: Method, path: &str, auth: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match auth {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request inside an `api_request` span and maps non-2xx
    /// statuses to `ApiError::Status` with a best-effort message.
    async fn execute(
        &self,
        method: &Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let req_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "api_request",
            method = %method,
            path = %path,
            req_id = %req_id,
        );

        async move {
            let started = Instant::now();
            let response = builder
                .header(REQUEST_ID_HEADER, req_id.to_string())
                .send()
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, "request failed before a response arrived");
                    ApiError::Network(e)
                })?;

            let status = response.status();
            let latency_ms = started.elapsed().as_millis() as u64;
            if status.is_success() {
                tracing::debug!(status = status.as_u16(), latency_ms, "response");
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            let message = extract_message(&body);
            tracing::warn!(status = status.as_u16(), latency_ms, ?message, "backend rejected request");
            Err(ApiError::Status { status, message })
        }
        .instrument(span)
        .await
    }

    /// send
    ///
    /// Builds, customises (query, JSON or multipart body via `build`) and
    /// executes one request. Every endpoint method goes through here.
    async fn send(
        &self,
        method: Method,
        path: &str,
        auth: Option<&str>,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ApiError> {
        let builder = build(self.request(method.clone(), path, auth));
        self.execute(&method, path, builder).await
    }

    /// Reads a 2xx body as JSON. A shape mismatch is `ApiError::Decode`.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Like `decode`, but an empty body is `None` rather than an error.
    async fn decode_optional<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ApiError> {
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    // --- Account endpoints ---

    /// `PUT /auth/update-email?email=&newEmail=`
    pub async fn update_email(
        &self,
        email: &str,
        new_email: &str,
        auth: Option<&str>,
    ) -> Result<String, ApiError> {
        let response = self
            .send(Method::PUT, "/auth/update-email", auth, |b| {
                b.query(&[("email", email), ("newEmail", new_email)])
            })
            .await?;
        Ok(response.text().await?)
    }

    /// `DELETE /auth/delete-account/{userId}`
    pub async fn delete_account(&self, user_id: &str, auth: Option<&str>) -> Result<String, ApiError> {
        let path = format!("/auth/delete-account/{}", encode_segment(user_id));
        let response = self.send(Method::DELETE, &path, auth, |b| b).await?;
        Ok(response.text().await?)
    }

    // --- Content endpoints ---

    /// `GET /api/{kind}/getAll`
    pub async fn list<T: Content>(&self, auth: Option<&str>) -> Result<Vec<T>, ApiError> {
        let path = format!("/api/{}/getAll", T::KIND.segment());
        let response = self.send(Method::GET, &path, auth, |b| b).await?;
        Self::decode(response).await
    }

    /// `GET /api/{kind}/getById/{id}` (or `getByName/{name}` for events).
    pub async fn get<T: Content>(&self, key: &str, auth: Option<&str>) -> Result<T, ApiError> {
        let lookup = match T::KIND.lookup() {
            Lookup::ById => "getById",
            Lookup::ByName => "getByName",
        };
        let path = format!("/api/{}/{}/{}", T::KIND.segment(), lookup, encode_segment(key));
        let response = self.send(Method::GET, &path, auth, |b| b).await?;
        Self::decode(response).await
    }

    /// `GET /api/events/getByName/{name}`
    pub async fn get_event_by_name(&self, name: &str, auth: Option<&str>) -> Result<Event, ApiError> {
        self.get::<Event>(name, auth).await
    }

    /// `POST /api/{kind}/upload` with a multipart body. Returns the stored
    /// item when the backend echoes it.
    pub async fn create<T: Content>(
        &self,
        form: ContentForm,
        auth: Option<&str>,
    ) -> Result<Option<T>, ApiError> {
        check_kind::<T>(&form)?;
        let path = format!("/api/{}/upload", T::KIND.segment());
        let response = self
            .send(Method::POST, &path, auth, |b| b.multipart(form.into_multipart()))
            .await?;
        Self::decode_optional(response).await
    }

    /// `PATCH /api/{kind}/update/{id}` with a multipart body.
    pub async fn update<T: Content>(
        &self,
        id: i64,
        form: ContentForm,
        auth: Option<&str>,
    ) -> Result<Option<T>, ApiError> {
        check_kind::<T>(&form)?;
        let path = format!("/api/{}/update/{}", T::KIND.segment(), id);
        let response = self
            .send(Method::PATCH, &path, auth, |b| b.multipart(form.into_multipart()))
            .await?;
        Self::decode_optional(response).await
    }

    /// `DELETE /api/{kind}/delete/{id}`
    pub async fn delete(&self, kind: ContentKind, id: i64, auth: Option<&str>) -> Result<(), ApiError> {
        let path = format!("/api/{}/delete/{}", kind.segment(), id);
        self.send(Method::DELETE, &path, auth, |b| b).await?;
        Ok(())
    }

    // --- Admin endpoints ---

    /// `PUT /api/admin/assign-role?userEmail=&newrole=`
    pub async fn assign_role(
        &self,
        user_email: &str,
        new_role: &str,
        auth: Option<&str>,
    ) -> Result<String, ApiError> {
        let response = self
            .send(Method::PUT, "/api/admin/assign-role", auth, |b| {
                b.query(&[("userEmail", user_email), ("newrole", new_role)])
            })
            .await?;
        Ok(response.text().await?)
    }

    /// `GET /api/admin/getAllUsers`, a flat list of emails.
    pub async fn get_all_users(&self, auth: Option<&str>) -> Result<Vec<String>, ApiError> {
        let response = self
            .send(Method::GET, "/api/admin/getAllUsers", auth, |b| b)
            .await?;
        Self::decode(response).await
    }

    /// `POST /api/email/broadcast`. Returns the backend's confirmation text.
    pub async fn broadcast_email(
        &self,
        request: &BroadcastRequest,
        auth: Option<&str>,
    ) -> Result<String, ApiError> {
        let response = self
            .send(Method::POST, "/api/email/broadcast", auth, |b| b.json(request))
            .await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let response = self
            .send(Method::POST, "/auth/login", None, |b| b.json(credentials))
            .await?;
        Self::decode(response).await
    }

    async fn signup(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let response = self
            .send(Method::POST, "/auth/signup", None, |b| b.json(credentials))
            .await?;
        Ok(response.text().await?)
    }
}

fn check_kind<T: Content>(form: &ContentForm) -> Result<(), ApiError> {
    if form.kind() != T::KIND {
        return Err(ApiError::KindMismatch {
            expected: T::KIND.singular(),
            got: form.kind().singular(),
        });
    }
    Ok(())
}

/// encode_segment
///
/// Percent-encodes a value placed in a single path segment (ids, event names,
/// user ids). Everything outside the unreserved set is escaped, so `/` and
/// spaces cannot change the route.
fn encode_segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// extract_message
///
/// Best-effort human-readable message from an error body: a JSON `message`
/// (or `error`) string, a bare JSON string, or short plain text. HTML error
/// pages and empty bodies yield `None`.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let text = match &value {
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|v| v.as_str())
                .or_else(|| map.get("error").and_then(|v| v.as_str())),
            serde_json::Value::String(s) => Some(s.as_str()),
            _ => None,
        };
        return text
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    if trimmed.starts_with('<') || trimmed.len() > MAX_PLAIN_MESSAGE_LEN {
        return None;
    }
    Some(trimmed.to_string())
}

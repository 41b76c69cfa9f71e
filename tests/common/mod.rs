#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mucu_portal::{
    AppConfig, ApiClient, ApiError, AuthApi, MemoryStorage, SessionManager, SessionStorage,
    StorageError,
    models::{AuthResponse, BroadcastRequest, Credentials, Department, Event, Media},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};
use tokio::net::TcpListener;

pub const JWT_SECRET: &str = "mock-backend-secret-value-0123456789";
pub const GOOD_PASSWORD: &str = "correct-horse";

// --- Recorded traffic ---

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub bearer: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Default)]
pub struct Inner {
    pub calls: Vec<Call>,
    /// Replaces the normal login behaviour with a fixed JSON body.
    pub login_reply: Option<serde_json::Value>,
    /// Makes signup fail with this status and raw body.
    pub signup_error: Option<(StatusCode, String)>,
    pub departments: Vec<Department>,
    pub events: Vec<Event>,
    /// Served verbatim by the events list instead of `events`.
    pub events_body: Option<String>,
    pub media: Vec<Media>,
    pub fail_delete: bool,
    pub fail_list: bool,
    /// Multipart bodies received by upload/update, as (name, value-or-filename).
    pub multipart_bodies: Vec<Vec<(String, String)>>,
    pub broadcasts: Vec<BroadcastRequest>,
}

#[derive(Clone, Default)]
pub struct MockState {
    pub inner: Arc<Mutex<Inner>>,
}

impl MockState {
    pub fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    pub fn calls_to(&self, method: &str, path: &str) -> Vec<Call> {
        self.with(|i| {
            i.calls
                .iter()
                .filter(|c| c.method == method && c.path == path)
                .cloned()
                .collect()
        })
    }
}

pub struct MockBackend {
    pub address: String,
    pub state: MockState,
}

impl MockBackend {
    pub fn config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.address.clone(),
            ..AppConfig::default()
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config()).unwrap()
    }

    /// A session manager wired to this backend over an in-memory store.
    pub fn session(&self, storage: MemoryStorage) -> SessionManager {
        SessionManager::new(Arc::new(self.client()), Arc::new(storage))
    }
}

// --- Tokens ---

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub fn mint_token(email: &str, role: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = Claims {
        sub: email.to_string(),
        role: role.to_string(),
        exp: (now + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// The backend's own authorization: a valid token whose role is admin.
fn require_admin(headers: &HeaderMap) -> Result<Claims, Response> {
    let token = bearer(headers).ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, Json(json!({"message": "Missing token"}))).into_response()
    })?;
    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED.into_response())?;
    if !data.claims.role.eq_ignore_ascii_case("admin") {
        return Err((StatusCode::FORBIDDEN, "Admins only").into_response());
    }
    Ok(data.claims)
}

// --- Handlers ---

async fn record(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let call = Call {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        bearer: bearer(request.headers()),
        request_id: request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    state.with(|i| i.calls.push(call));
    next.run(request).await
}

async fn login(State(state): State<MockState>, Json(creds): Json<Credentials>) -> Response {
    if let Some(reply) = state.with(|i| i.login_reply.clone()) {
        return Json(reply).into_response();
    }
    if creds.password != GOOD_PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid email or password"})),
        )
            .into_response();
    }
    let role = if creds.email.starts_with("admin") {
        "ADMIN"
    } else {
        "MEMBER"
    };
    Json(json!({
        "token": mint_token(&creds.email, role),
        "email": creds.email,
        "role": role,
    }))
    .into_response()
}

async fn signup(State(state): State<MockState>, Json(_creds): Json<Credentials>) -> Response {
    match state.with(|i| i.signup_error.clone()) {
        Some((status, body)) => (status, body).into_response(),
        None => "User registered successfully. Please verify your email.".into_response(),
    }
}

async fn list_departments(State(state): State<MockState>) -> Response {
    let (fail, items) = state.with(|i| (i.fail_list, i.departments.clone()));
    if fail {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(items).into_response()
}

async fn department_by_id(State(state): State<MockState>, Path(id): Path<i64>) -> Response {
    match state.with(|i| i.departments.iter().find(|d| d.id == id).cloned()) {
        Some(d) => Json(d).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Department not found"}))).into_response(),
    }
}

async fn read_multipart(mut multipart: Multipart) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let value = match field.file_name() {
            Some(file_name) => {
                let file_name = file_name.to_string();
                let bytes = field.bytes().await.unwrap();
                format!("{file_name} ({} bytes)", bytes.len())
            }
            None => field.text().await.unwrap(),
        };
        fields.push((name, value));
    }
    fields
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> &'a str {
    fields
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default()
}

async fn upload_department(
    State(state): State<MockState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    let fields = read_multipart(multipart).await;
    let dept = state.with(|i| {
        let dept = Department {
            id: i.departments.iter().map(|d| d.id).max().unwrap_or(0) + 1,
            department_name: field(&fields, "departmentName").to_string(),
            department_description: field(&fields, "departmentDescription").to_string(),
            department_location: field(&fields, "departmentLocation").to_string(),
            group_url: field(&fields, "groupUrl").to_string(),
            registration_url: field(&fields, "registrationUrl").to_string(),
            thumbnail: field(&fields, "Thumbnail").to_string(),
            created_at: Some("2026-10-16T09:00:00".to_string()),
        };
        i.departments.push(dept.clone());
        i.multipart_bodies.push(fields.clone());
        dept
    });
    Json(dept).into_response()
}

async fn update_department(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    let fields = read_multipart(multipart).await;
    state.with(|i| {
        i.multipart_bodies.push(fields.clone());
        match i.departments.iter_mut().find(|d| d.id == id) {
            Some(d) => {
                d.department_name = field(&fields, "departmentName").to_string();
                // The backend answers updates with an empty body.
                StatusCode::OK.into_response()
            }
            None => StatusCode::NOT_FOUND.into_response(),
        }
    })
}

async fn delete_department(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    state.with(|i| {
        if i.fail_delete {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Constraint violation").into_response();
        }
        i.departments.retain(|d| d.id != id);
        "Department deleted".into_response()
    })
}

async fn event_by_name(State(state): State<MockState>, Path(name): Path<String>) -> Response {
    match state.with(|i| i.events.iter().find(|e| e.event_name == name).cloned()) {
        Some(e) => Json(e).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_events(State(state): State<MockState>) -> Response {
    let (raw, items) = state.with(|i| (i.events_body.clone(), i.events.clone()));
    match raw {
        Some(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        None => Json(items).into_response(),
    }
}

async fn media_by_id(State(state): State<MockState>, Path(id): Path<i64>) -> Response {
    match state.with(|i| i.media.iter().find(|m| m.id == id).cloned()) {
        Some(m) => Json(m).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_account(Path(user_id): Path<String>) -> Response {
    format!("Account {user_id} deleted").into_response()
}

async fn all_users(headers: HeaderMap) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    Json(vec!["admin@mucu.org", "member@mucu.org"]).into_response()
}

async fn assign_role(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    match (params.get("userEmail"), params.get("newrole")) {
        (Some(email), Some(role)) => format!("Role of {email} set to {role}").into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn broadcast(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(request): Json<BroadcastRequest>,
) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    state.with(|i| i.broadcasts.push(request));
    "Broadcast queued for 2 verified users".into_response()
}

async fn update_email(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("newEmail") {
        Some(new_email) => format!("Email updated to {new_email}").into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub async fn spawn_backend(state: MockState) -> MockBackend {
    let router = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/update-email", put(update_email))
        .route("/auth/delete-account/{user_id}", delete(delete_account))
        .route("/api/department/getAll", get(list_departments))
        .route("/api/department/getById/{id}", get(department_by_id))
        .route("/api/department/upload", post(upload_department))
        .route("/api/department/update/{id}", patch(update_department))
        .route("/api/department/delete/{id}", delete(delete_department))
        .route("/api/events/getAll", get(list_events))
        .route("/api/events/getByName/{name}", get(event_by_name))
        .route("/api/media/getById/{id}", get(media_by_id))
        .route("/api/admin/getAllUsers", get(all_users))
        .route("/api/admin/assign-role", put(assign_role))
        .route("/api/email/broadcast", post(broadcast))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockBackend { address, state }
}

pub fn department(id: i64, name: &str) -> Department {
    Department {
        id,
        department_name: name.to_string(),
        department_description: format!("{name} ministry"),
        department_location: "Chapel".to_string(),
        group_url: format!("https://chat.example/{id}"),
        registration_url: format!("https://forms.example/{id}"),
        thumbnail: format!("https://cdn.example/{id}.jpg"),
        created_at: None,
    }
}

// --- Stub auth API for session tests that need no HTTP ---

/// Counts calls and answers with canned results.
pub struct StubAuthApi {
    pub login_reply: Mutex<Option<Result<AuthResponse, ApiError>>>,
    pub signup_reply: Mutex<Option<Result<String, ApiError>>>,
    pub login_calls: AtomicUsize,
    pub signup_calls: AtomicUsize,
}

impl StubAuthApi {
    pub fn new() -> Self {
        Self {
            login_reply: Mutex::new(None),
            signup_reply: Mutex::new(None),
            login_calls: AtomicUsize::new(0),
            signup_calls: AtomicUsize::new(0),
        }
    }

    pub fn logging_in_with(response: AuthResponse) -> Self {
        let stub = Self::new();
        *stub.login_reply.lock().unwrap() = Some(Ok(response));
        stub
    }

    pub fn failing_signup(error: ApiError) -> Self {
        let stub = Self::new();
        *stub.signup_reply.lock().unwrap() = Some(Err(error));
        stub
    }

    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn signup_count(&self) -> usize {
        self.signup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for StubAuthApi {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login_reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(AuthResponse::default()))
    }

    async fn signup(&self, _credentials: &Credentials) -> Result<String, ApiError> {
        self.signup_calls.fetch_add(1, Ordering::SeqCst);
        self.signup_reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

pub fn auth_response(token: Option<&str>, email: Option<&str>, role: Option<&str>) -> AuthResponse {
    AuthResponse {
        token: token.map(str::to_string),
        email: email.map(str::to_string),
        role: role.map(str::to_string),
    }
}

pub fn short_timeout_config(address: &str) -> AppConfig {
    AppConfig {
        api_base_url: address.to_string(),
        request_timeout: Duration::from_secs(2),
        ..AppConfig::default()
    }
}

// --- Storage that fails on chosen keys ---

/// Wraps a `MemoryStorage` and fails `set`/`remove` for the listed keys only.
#[derive(Clone, Default)]
pub struct KeyFailingStorage {
    pub inner: MemoryStorage,
    pub fail_set: Arc<Mutex<Vec<&'static str>>>,
    pub fail_remove: Arc<Mutex<Vec<&'static str>>>,
}

impl KeyFailingStorage {
    pub fn over(inner: MemoryStorage) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn failing_set(self, key: &'static str) -> Self {
        self.fail_set.lock().unwrap().push(key);
        self
    }

    pub fn failing_remove(self, key: &'static str) -> Self {
        self.fail_remove.lock().unwrap().push(key);
        self
    }

    fn refuse(list: &Mutex<Vec<&'static str>>, key: &str) -> Result<(), StorageError> {
        if list.lock().unwrap().iter().any(|k| *k == key) {
            return Err(StorageError::Unavailable(format!("{key} is read-only")));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for KeyFailingStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::refuse(&self.fail_set, key)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::refuse(&self.fail_remove, key)?;
        self.inner.remove(key).await
    }
}

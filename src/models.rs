use serde::{Deserialize, Deserializer, Serialize};

// --- Identity Schemas ---

/// User
///
/// The identity persisted under the `user` storage key. The backend has no
/// separate user id on the login path, so `id` mirrors the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct User {
    pub id: String,
    pub email: String,
    // The RBAC field: compared case-insensitively against "admin".
    pub role: String,
}

/// Credentials
///
/// Transient email/password pair. Sent to `/auth/login` or `/auth/signup` and
/// dropped; never persisted and never logged.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// AuthResponse
///
/// Body of a successful `POST /auth/login`. Every field is optional on the
/// wire; the session manager decides whether the shape is usable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// BroadcastRequest
///
/// Payload for `POST /api/email/broadcast`. Sent to every verified user.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BroadcastRequest {
    pub subject: String,
    pub body: String,
}

// --- Content Schemas (served by /api/{kind}/...) ---

/// null_as_empty
///
/// Optional text columns come back as `null` when the item was saved without
/// them (a missing thumbnail is the usual case). They are read as `""` so one
/// sparse row cannot fail a whole list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Department
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub department_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department_description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department_location: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub group_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub registration_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Media
///
/// A gallery entry: a link to the media itself plus a thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub media_url: String,
    pub media_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub media_thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Resource
///
/// Downloadable study material. The backend pluralises these field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: i64,
    pub resources_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumbnail: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resources_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resources_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Event
///
/// `event_date` is kept as the backend's string; it is only displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub event_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub event_description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub event_location: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub event_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumbnails: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

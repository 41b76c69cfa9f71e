//! Content kinds managed from the admin section and the multipart forms used
//! to create or update them.

use std::{fmt, path::Path, str::FromStr};

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use crate::{
    error::{ApiError, ValidationError},
    models::{Department, Event, Media, Resource},
};

/// ContentKind
///
/// The four collections exposed under `/api/{segment}/...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Department,
    Media,
    Resource,
    Event,
}

/// How a single item is looked up. Events are addressed by name, the rest by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    ById,
    ByName,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Department,
        ContentKind::Media,
        ContentKind::Resource,
        ContentKind::Event,
    ];

    /// Path segment under `/api`.
    pub fn segment(self) -> &'static str {
        match self {
            ContentKind::Department => "department",
            ContentKind::Media => "media",
            ContentKind::Resource => "resource",
            ContentKind::Event => "events",
        }
    }

    /// Singular noun used in "Failed to save ..." / "Failed to delete ...".
    pub fn singular(self) -> &'static str {
        match self {
            ContentKind::Department => "department",
            ContentKind::Media => "media",
            ContentKind::Resource => "resource",
            ContentKind::Event => "event",
        }
    }

    /// Plural noun used in "Failed to fetch ...".
    pub fn plural(self) -> &'static str {
        match self {
            ContentKind::Department => "departments",
            ContentKind::Media => "media",
            ContentKind::Resource => "resources",
            ContentKind::Event => "events",
        }
    }

    pub fn lookup(self) -> Lookup {
        match self {
            ContentKind::Event => Lookup::ByName,
            _ => Lookup::ById,
        }
    }

    /// Multipart text fields accepted by upload/update, in submission order.
    /// The first entry is the item's name and is mandatory.
    pub fn text_fields(self) -> &'static [&'static str] {
        match self {
            ContentKind::Department => &[
                "departmentName",
                "departmentDescription",
                "groupUrl",
                "registrationUrl",
                "departmentLocation",
            ],
            ContentKind::Media => &["mediaName", "description", "mediaUrl"],
            // The backend reads the singular "resourceName" on upload even
            // though it serves "resourcesName".
            ContentKind::Resource => &["resourceName", "resourcesDescription", "resourcesUrl"],
            ContentKind::Event => &["eventName", "eventDescription", "eventLocation", "eventDate"],
        }
    }

    /// Name of the optional file part.
    pub fn file_field(self) -> &'static str {
        match self {
            ContentKind::Department | ContentKind::Resource => "Thumbnail",
            ContentKind::Media => "mediaThumbnail",
            ContentKind::Event => "Thumbnails",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "department" | "departments" => Ok(ContentKind::Department),
            "media" => Ok(ContentKind::Media),
            "resource" | "resources" => Ok(ContentKind::Resource),
            "event" | "events" => Ok(ContentKind::Event),
            other => Err(format!(
                "unknown content kind '{other}' (expected department, media, resource or event)"
            )),
        }
    }
}

/// Content
///
/// Binds a wire model to its collection so the API client can be generic
/// over the four kinds.
pub trait Content: DeserializeOwned + Send + 'static {
    const KIND: ContentKind;

    fn id(&self) -> i64;
}

impl Content for Department {
    const KIND: ContentKind = ContentKind::Department;
    fn id(&self) -> i64 {
        self.id
    }
}

impl Content for Media {
    const KIND: ContentKind = ContentKind::Media;
    fn id(&self) -> i64 {
        self.id
    }
}

impl Content for Resource {
    const KIND: ContentKind = ContentKind::Resource;
    fn id(&self) -> i64 {
        self.id
    }
}

impl Content for Event {
    const KIND: ContentKind = ContentKind::Event;
    fn id(&self) -> i64 {
        self.id
    }
}

/// Attachment
///
/// A file already read into memory, ready to become a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads `path` from disk. The part is named after the file's basename.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ApiError::Attachment {
                path: path.display().to_string(),
                source,
            })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        Ok(Self { file_name, bytes })
    }
}

/// ContentForm
///
/// The create/update body for one content kind. Only the kind's own fields
/// are accepted; the name field must be non-empty before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentForm {
    kind: ContentKind,
    fields: Vec<(&'static str, String)>,
    attachment: Option<Attachment>,
}

impl ContentForm {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            attachment: None,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Sets a text field, replacing any earlier value.
    pub fn set(mut self, field: &str, value: impl Into<String>) -> Result<Self, ValidationError> {
        let known = self
            .kind
            .text_fields()
            .iter()
            .copied()
            .find(|f| *f == field)
            .ok_or_else(|| ValidationError::UnknownField {
                kind: self.kind.singular(),
                field: field.to_string(),
            })?;
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == known) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((known, value)),
        }
        Ok(self)
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Checks the mandatory name field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name_field = self.kind.text_fields()[0];
        match self.get(name_field) {
            Some(v) if !v.trim().is_empty() => Ok(()),
            _ => Err(ValidationError::MissingField(name_field)),
        }
    }

    /// Builds the multipart body. Fields go out in the kind's declared order,
    /// unset fields as empty strings, the file part last.
    pub fn into_multipart(self) -> Form {
        let mut form = Form::new();
        for field in self.kind.text_fields() {
            let value = self.get(field).unwrap_or_default().to_string();
            form = form.text(*field, value);
        }
        if let Some(Attachment { file_name, bytes }) = self.attachment {
            form = form.part(self.kind.file_field(), Part::bytes(bytes).file_name(file_name));
        }
        form
    }
}

// Prefill an edit form from an existing item; the thumbnail is not re-sent.

impl From<&Department> for ContentForm {
    fn from(d: &Department) -> Self {
        Self {
            kind: ContentKind::Department,
            fields: vec![
                ("departmentName", d.department_name.clone()),
                ("departmentDescription", d.department_description.clone()),
                ("groupUrl", d.group_url.clone()),
                ("registrationUrl", d.registration_url.clone()),
                ("departmentLocation", d.department_location.clone()),
            ],
            attachment: None,
        }
    }
}

impl From<&Media> for ContentForm {
    fn from(m: &Media) -> Self {
        Self {
            kind: ContentKind::Media,
            fields: vec![
                ("mediaName", m.media_name.clone()),
                ("description", m.description.clone()),
                ("mediaUrl", m.media_url.clone()),
            ],
            attachment: None,
        }
    }
}

impl From<&Resource> for ContentForm {
    fn from(r: &Resource) -> Self {
        Self {
            kind: ContentKind::Resource,
            fields: vec![
                ("resourceName", r.resources_name.clone()),
                ("resourcesDescription", r.resources_description.clone()),
                ("resourcesUrl", r.resources_url.clone()),
            ],
            attachment: None,
        }
    }
}

impl From<&Event> for ContentForm {
    fn from(e: &Event) -> Self {
        Self {
            kind: ContentKind::Event,
            fields: vec![
                ("eventName", e.event_name.clone()),
                ("eventDescription", e.event_description.clone()),
                ("eventLocation", e.event_location.clone()),
                ("eventDate", e.event_date.clone()),
            ],
            attachment: None,
        }
    }
}

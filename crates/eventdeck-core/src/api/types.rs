//! Wire types for the events backend.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Backend identifier. The backend may send ids as strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        TextOrNumber::deserialize(deserializer).map(|raw| Self(raw.into_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl TextOrNumber {
    fn into_string(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

/// Accepts `"$99"` as well as `99` for display fields.
fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<TextOrNumber>::deserialize(deserializer)
        .map(|raw| raw.map(TextOrNumber::into_string).unwrap_or_default())
}

/// Signed-in user as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Event as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(alias = "_id")]
    pub id: ResourceId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub short_desc: String,
    #[serde(default)]
    pub full_desc: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub price: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<ResourceId>,
}

impl Event {
    /// Image glyph with the ticket fallback used across listings.
    pub fn image_or_default(&self) -> &str {
        match self.image.as_deref().map(str::trim) {
            Some(img) if !img.is_empty() => img,
            _ => "🎫",
        }
    }
}

/// Fields for creating an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: String,
    pub short_desc: String,
    pub full_desc: String,
    pub price: String,
    pub date: String,
    pub location: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Partial update; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Identity asserted by an external OAuth provider, sent to the upsert endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub provider: String,
    pub subject: String,
    pub email: String,
    pub name: String,
}

/// Body of register/login/oauth responses.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventResponse {
    #[serde(default)]
    pub event: Option<Event>,
}

/// Body of create/update/delete responses.
#[derive(Debug, Clone, Deserialize)]
pub struct MutationResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub event: Option<Event>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

//! Add-event form and the "my events" manager.

use std::fmt;

use anyhow::Result;

use crate::api::types::{Event, EventInput, EventPatch, MutationResponse, ResourceId};
use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::catalog::{Category, UnknownCategory};

pub const EVENT_ADDED: &str = "Event added successfully!";
pub const EVENT_UPDATED: &str = "Event updated successfully!";
pub const EVENT_DELETED: &str = "Event deleted successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    ShortDesc,
    FullDesc,
    Price,
    Date,
    Location,
    Category,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "title",
            FormField::ShortDesc => "short description",
            FormField::FullDesc => "full description",
            FormField::Price => "price",
            FormField::Date => "date",
            FormField::Location => "location",
            FormField::Category => "category",
        }
    }
}

/// Why a form was refused before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    Missing(Vec<FormField>),
    Category(String),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::Missing(fields) => {
                let labels: Vec<&str> = fields.iter().map(|field| field.label()).collect();
                write!(f, "Missing required fields: {}", labels.join(", "))
            }
            FormError::Category(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for FormError {}

/// Values typed into the add form. Everything but `image` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventForm {
    pub title: String,
    pub short_desc: String,
    pub full_desc: String,
    pub price: String,
    pub date: String,
    pub location: String,
    pub category: String,
    pub image: Option<String>,
}

impl EventForm {
    /// Checks required fields and normalizes the category.
    ///
    /// # Errors
    /// Lists every blank required field, or names an unknown category.
    pub fn validate(&self) -> Result<EventInput, FormError> {
        let fields = [
            (FormField::Title, &self.title),
            (FormField::ShortDesc, &self.short_desc),
            (FormField::FullDesc, &self.full_desc),
            (FormField::Price, &self.price),
            (FormField::Date, &self.date),
            (FormField::Location, &self.location),
            (FormField::Category, &self.category),
        ];
        let missing: Vec<FormField> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() {
            return Err(FormError::Missing(missing));
        }

        let category: Category = self
            .category
            .parse()
            .map_err(|err: UnknownCategory| FormError::Category(err.to_string()))?;

        Ok(EventInput {
            title: self.title.trim().to_string(),
            short_desc: self.short_desc.trim().to_string(),
            full_desc: self.full_desc.trim().to_string(),
            price: self.price.trim().to_string(),
            date: self.date.trim().to_string(),
            location: self.location.trim().to_string(),
            category: category.as_str().to_string(),
            image: self
                .image
                .as_deref()
                .map(str::trim)
                .filter(|image| !image.is_empty())
                .map(str::to_string),
        })
    }
}

/// Outcome of a create/update/delete, ready to show as a toast.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub message: String,
    pub event: Option<Event>,
}

fn into_mutation(
    response: MutationResponse,
    success_message: &str,
    fallback: &str,
) -> Result<Mutation, ApiError> {
    if !response.success {
        return Err(ApiError::new(
            ApiErrorKind::HttpStatus,
            response.message.unwrap_or_else(|| fallback.to_string()),
        ));
    }
    Ok(Mutation {
        message: success_message.to_string(),
        event: response.event,
    })
}

/// Validates the form, then creates the event.
///
/// # Errors
/// A [`FormError`] (nothing sent) or the backend's [`ApiError`].
pub async fn create_event(api: &ApiClient, form: &EventForm) -> Result<Mutation> {
    let input = form.validate()?;
    let response = api.create_event(&input).await?;
    Ok(into_mutation(response, EVENT_ADDED, "Failed to create event")?)
}

/// Sends only the fields present in `patch`.
///
/// # Errors
/// Refuses an empty patch or an unknown category without a network call;
/// otherwise the backend's [`ApiError`].
pub async fn update_event(api: &ApiClient, id: &ResourceId, patch: &EventPatch) -> Result<Mutation> {
    if patch.is_empty() {
        anyhow::bail!("Nothing to update");
    }
    let mut patch = patch.clone();
    if let Some(category) = patch.category.as_deref() {
        let category: Category = category.parse()?;
        patch.category = Some(category.as_str().to_string());
    }
    let response = api.update_event(id, &patch).await?;
    Ok(into_mutation(response, EVENT_UPDATED, "Failed to update event")?)
}

/// The signed-in user's events as shown by the manager.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MyEvents {
    events: Vec<Event>,
}

impl MyEvents {
    /// Loads the list from the backend.
    ///
    /// # Errors
    /// `AuthRequired` when signed out, else the backend's message.
    pub async fn load(api: &ApiClient) -> Result<Self, ApiError> {
        Ok(Self {
            events: api.my_events().await?,
        })
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn find(&self, id: &ResourceId) -> Option<&Event> {
        self.events.iter().find(|event| &event.id == id)
    }

    /// Deletes on the backend and, on success, drops the event from this
    /// list only. `confirm` is asked first; declining sends nothing and
    /// returns `Ok(None)`.
    ///
    /// # Errors
    /// The backend's [`ApiError`]; the list is left untouched.
    pub async fn delete<F>(
        &mut self,
        api: &ApiClient,
        id: &ResourceId,
        confirm: F,
    ) -> Result<Option<Mutation>, ApiError>
    where
        F: FnOnce(Option<&Event>) -> bool,
    {
        if !confirm(self.find(id)) {
            tracing::debug!(%id, "delete declined");
            return Ok(None);
        }
        let response = api.delete_event(id).await?;
        let mutation = into_mutation(response, EVENT_DELETED, "Failed to delete event")?;
        self.events.retain(|event| &event.id != id);
        Ok(Some(mutation))
    }
}

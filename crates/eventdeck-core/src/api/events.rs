//! `/api/events/*` endpoints.

use reqwest::Method;

use super::types::{
    Event, EventInput, EventPatch, EventResponse, EventsResponse, MutationResponse, ResourceId,
};
use super::{Access, ApiClient, ApiError, Request};

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All";

/// Server-side catalog filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl EventQuery {
    /// Query parameters sent to `GET /api/events`.
    ///
    /// `category` is dropped when unset or `All`; `search` when blank.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        let mut params = Vec::with_capacity(2);
        if let Some(category) = self.category.as_deref().map(str::trim)
            && !category.is_empty()
            && category != ALL_CATEGORIES
        {
            params.push(("category", category));
        }
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            params.push(("search", search));
        }
        params
    }
}

impl ApiClient {
    /// `GET /api/events?category=&search=`
    ///
    /// # Errors
    /// Returns the backend's message on a non-success status.
    pub async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, ApiError> {
        let params = query.params();
        let response: EventsResponse = self
            .send(Request::<()> {
                method: Method::GET,
                segments: &["api", "events"],
                query: &params,
                body: None,
                access: Access::Public,
                fallback: "Failed to fetch events",
            })
            .await?;
        Ok(response.events)
    }

    /// `GET /api/events/:id`. `Ok(None)` when the backend has no such event.
    ///
    /// # Errors
    /// Returns the backend's message on a non-success status other than 404.
    pub async fn get_event(&self, id: &ResourceId) -> Result<Option<Event>, ApiError> {
        let result: Result<EventResponse, ApiError> = self
            .send(Request::<()> {
                method: Method::GET,
                segments: &["api", "events", id.as_str()],
                query: &[],
                body: None,
                access: Access::Public,
                fallback: "Failed to fetch event",
            })
            .await;
        match result {
            Ok(response) => Ok(response.event),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// `POST /api/events` (auth required)
    ///
    /// # Errors
    /// `AuthRequired` without a token, else the backend's message.
    pub async fn create_event(&self, input: &EventInput) -> Result<MutationResponse, ApiError> {
        self.send(Request {
            method: Method::POST,
            segments: &["api", "events"],
            query: &[],
            body: Some(input),
            access: Access::Authenticated,
            fallback: "Failed to create event",
        })
        .await
    }

    /// `PUT /api/events/:id` (auth required)
    ///
    /// # Errors
    /// `AuthRequired` without a token, else the backend's message.
    pub async fn update_event(
        &self,
        id: &ResourceId,
        patch: &EventPatch,
    ) -> Result<MutationResponse, ApiError> {
        self.send(Request {
            method: Method::PUT,
            segments: &["api", "events", id.as_str()],
            query: &[],
            body: Some(patch),
            access: Access::Authenticated,
            fallback: "Failed to update event",
        })
        .await
    }

    /// `DELETE /api/events/:id` (auth required)
    ///
    /// # Errors
    /// `AuthRequired` without a token, else the backend's message.
    pub async fn delete_event(&self, id: &ResourceId) -> Result<MutationResponse, ApiError> {
        self.send(Request::<()> {
            method: Method::DELETE,
            segments: &["api", "events", id.as_str()],
            query: &[],
            body: None,
            access: Access::Authenticated,
            fallback: "Failed to delete event",
        })
        .await
    }

    /// `GET /api/events/user/my-events` (auth required)
    ///
    /// # Errors
    /// `AuthRequired` without a token, else the backend's message.
    pub async fn my_events(&self) -> Result<Vec<Event>, ApiError> {
        let response: EventsResponse = self
            .send(Request::<()> {
                method: Method::GET,
                segments: &["api", "events", "user", "my-events"],
                query: &[],
                body: None,
                access: Access::Authenticated,
                fallback: "Failed to fetch user events",
            })
            .await?;
        Ok(response.events)
    }
}

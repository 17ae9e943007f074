//! Catalog and detail view models.
//!
//! Filtering happens on the backend; the catalog only tracks which request
//! is allowed to update what the user sees.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::api::types::{Event, ResourceId};
use crate::api::{ApiClient, ApiError, EventQuery};

/// Category label meaning "no filter".
pub use crate::api::ALL_CATEGORIES;

/// Event categories offered by the add form and the catalog filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Music,
    Conference,
    Sports,
    Food,
    Art,
    Entertainment,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Music,
        Category::Conference,
        Category::Sports,
        Category::Food,
        Category::Art,
        Category::Entertainment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Music => "Music",
            Category::Conference => "Conference",
            Category::Sports => "Sports",
            Category::Food => "Food",
            Category::Art => "Art",
            Category::Entertainment => "Entertainment",
        }
    }

    /// Parses a catalog filter. `All` (any case) means no filter.
    ///
    /// # Errors
    /// Returns an error naming the known categories.
    pub fn parse_filter(value: &str) -> Result<Option<Category>, UnknownCategory> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ALL_CATEGORIES) {
            return Ok(None);
        }
        value.parse().map(Some)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        write!(
            f,
            "Unknown category '{}' (expected one of: {}, {ALL_CATEGORIES})",
            self.0,
            known.join(", ")
        )
    }
}

impl std::error::Error for UnknownCategory {}

/// Opaque id matching a catalog response to the refresh that asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

/// Tracks the latest refresh; older results are stale.
#[derive(Debug, Default)]
pub struct LatestOnly {
    next: u64,
    active: Option<RequestId>,
}

impl LatestOnly {
    /// Start a new request, superseding any in flight.
    pub fn begin(&mut self) -> RequestId {
        let id = RequestId(self.next);
        self.next += 1;
        self.active = Some(id);
        id
    }

    pub fn is_active(&self, id: RequestId) -> bool {
        self.active == Some(id)
    }

    /// Finish the request if it's still the latest.
    pub fn finish_if_active(&mut self, id: RequestId) -> bool {
        if self.is_active(id) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CatalogState {
    #[default]
    Loading,
    Loaded(Vec<Event>),
    Empty,
    Failed(String),
}

impl CatalogState {
    fn from_result(result: Result<Vec<Event>, ApiError>) -> Self {
        match result {
            Ok(events) if events.is_empty() => CatalogState::Empty,
            Ok(events) => CatalogState::Loaded(events),
            Err(err) => CatalogState::Failed(err.to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct CatalogInner {
    state: CatalogState,
    query: EventQuery,
    requests: LatestOnly,
}

/// Event catalog with server-side filters and latest-only refreshes.
pub struct Catalog {
    api: ApiClient,
    inner: Mutex<CatalogInner>,
}

impl Catalog {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            inner: Mutex::new(CatalogInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CatalogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CatalogState {
        self.lock().state.clone()
    }

    /// Filter of the most recent refresh.
    pub fn query(&self) -> EventQuery {
        self.lock().query.clone()
    }

    /// Marks a refresh as started; the state goes back to `Loading`.
    pub fn begin(&self, query: EventQuery) -> RequestId {
        let mut inner = self.lock();
        inner.query = query;
        inner.state = CatalogState::Loading;
        inner.requests.begin()
    }

    /// Applies a response. Returns `false` (and changes nothing) when a newer
    /// refresh has started since `id` was issued.
    pub fn apply(&self, id: RequestId, result: Result<Vec<Event>, ApiError>) -> bool {
        let mut inner = self.lock();
        if !inner.requests.finish_if_active(id) {
            tracing::debug!(?id, "discarding stale catalog response");
            return false;
        }
        inner.state = CatalogState::from_result(result);
        true
    }

    /// Fetches the catalog for `query`.
    ///
    /// Returns the new state, or `None` if the response was superseded.
    pub async fn refresh(&self, query: EventQuery) -> Option<CatalogState> {
        let id = self.begin(query.clone());
        let result = self.api.list_events(&query).await;
        if self.apply(id, result) {
            Some(self.state())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loaded(Box<Event>),
    NotFound,
    Failed(String),
}

/// Single fetch for the detail view.
pub async fn load_detail(api: &ApiClient, id: &ResourceId) -> DetailState {
    if id.as_str().trim().is_empty() {
        return DetailState::NotFound;
    }
    match api.get_event(id).await {
        Ok(Some(event)) => DetailState::Loaded(Box::new(event)),
        Ok(None) => DetailState::NotFound,
        Err(err) => DetailState::Failed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::session::SessionContext;

    fn event_json(id: &str, title: &str, category: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "title": title,
            "shortDesc": "short",
            "fullDesc": "full",
            "price": "$10",
            "date": "July 15, 2026",
            "location": "Central Park",
            "category": category
        })
    }

    fn api(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), None, SessionContext::new().handle()).unwrap()
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("music".parse::<Category>().unwrap(), Category::Music);
        assert_eq!(Category::parse_filter("all").unwrap(), None);
        assert_eq!(Category::parse_filter("").unwrap(), None);
        assert_eq!(
            Category::parse_filter("Sports").unwrap(),
            Some(Category::Sports)
        );
        let err = "Theatre".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("Music, Conference"));
    }

    #[test]
    fn test_latest_only_discards_superseded() {
        let mut tracker = LatestOnly::default();
        let first = tracker.begin();
        let second = tracker.begin();
        assert!(!tracker.is_active(first));
        assert!(!tracker.finish_if_active(first));
        assert!(tracker.finish_if_active(second));
        assert!(!tracker.finish_if_active(second));
    }

    #[tokio::test]
    async fn test_refresh_loaded_and_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("category", "Music"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [event_json("1", "Jazz Night", "Music")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("category", "Art"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "events": [] })))
            .mount(&server)
            .await;

        let catalog = Catalog::new(api(&server));
        assert_eq!(catalog.state(), CatalogState::Loading);

        let state = catalog
            .refresh(EventQuery {
                category: Some("Music".to_string()),
                search: None,
            })
            .await
            .unwrap();
        match state {
            CatalogState::Loaded(events) => assert_eq!(events[0].title, "Jazz Night"),
            other => panic!("unexpected state: {other:?}"),
        }

        let state = catalog
            .refresh(EventQuery {
                category: Some("Art".to_string()),
                search: None,
            })
            .await;
        assert_eq!(state, Some(CatalogState::Empty));
    }

    #[tokio::test]
    async fn test_refresh_failure_carries_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "db down" })))
            .mount(&server)
            .await;

        let catalog = Catalog::new(api(&server));
        let state = catalog.refresh(EventQuery::default()).await;
        assert_eq!(state, Some(CatalogState::Failed("db down".to_string())));
    }

    #[tokio::test]
    async fn test_slow_stale_response_is_discarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("search", "slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "events": [event_json("1", "Stale", "Music")] }))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("search", "fast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [event_json("2", "Fresh", "Food")]
            })))
            .mount(&server)
            .await;

        let catalog = Catalog::new(api(&server));
        let slow = catalog.refresh(EventQuery {
            category: None,
            search: Some("slow".to_string()),
        });
        let fast = catalog.refresh(EventQuery {
            category: None,
            search: Some("fast".to_string()),
        });
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow, None);
        assert!(fast.is_some());
        match catalog.state() {
            CatalogState::Loaded(events) => {
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].title, "Fresh");
            }
            other => panic!("unexpected state: {other:?}"),
        }
        assert_eq!(catalog.query().search.as_deref(), Some("fast"));
    }

    #[tokio::test]
    async fn test_load_detail_not_found_and_loaded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "Event not found" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/events/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "event": event_json("42", "Marathon", "Sports")
            })))
            .mount(&server)
            .await;

        let api = api(&server);
        assert_eq!(
            load_detail(&api, &ResourceId::from("missing")).await,
            DetailState::NotFound
        );
        match load_detail(&api, &ResourceId::from("42")).await {
            DetailState::Loaded(event) => assert_eq!(event.category, "Sports"),
            other => panic!("unexpected state: {other:?}"),
        }
    }
}

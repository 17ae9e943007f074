//! CLI flows against a mocked events backend.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.grace.signature";

fn eventdeck(home: &Path, server: &MockServer) -> Command {
    let mut cmd = cargo_bin_cmd!("eventdeck");
    cmd.env("EVENTDECK_HOME", home)
        .env("EVENTDECK_API_URL", server.uri())
        .env("EVENTDECK_NO_BROWSER", "1")
        .env_remove("EVENTDECK_PASSWORD");
    cmd
}

fn event_json(id: &str, title: &str, category: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "shortDesc": "A night out",
        "fullDesc": "Doors open at seven.",
        "price": "$40",
        "date": "Sep 12, 2026",
        "location": "Blue Note",
        "category": category,
        "image": "🎷"
    })
}

fn write_session(home: &Path) {
    let session = json!({
        "token": TOKEN,
        "user": { "id": "u-1", "name": "Grace Hopper", "email": "grace@example.com" }
    });
    fs::write(home.join("session.json"), session.to_string()).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_filters_by_category_on_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("category", "Music"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event_json("e1", "Jazz Night", "Music")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    eventdeck(home.path(), &server)
        .args(["events", "list", "--category", "music"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jazz Night"))
        .stdout(predicate::str::contains("1 event(s)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_all_sends_no_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "events": [] })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    eventdeck(home.path(), &server)
        .args(["events", "list", "--category", "All", "--search", " "])
        .assert()
        .success()
        .stdout(predicate::str::contains("No events found matching your search."));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_unknown_category_fails_before_request() {
    let server = MockServer::start().await;
    Mock::given(path("/api/events"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    eventdeck(home.path(), &server)
        .args(["events", "list", "--category", "Theatre"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category 'Theatre'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_failure_shows_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "db down" })))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    eventdeck(home.path(), &server)
        .args(["events", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("db down"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_show_renders_detail_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/e1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "event": event_json("e1", "Jazz Night", "Music")
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Event not found" })))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    eventdeck(home.path(), &server)
        .args(["events", "show", "e1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("🎷 Jazz Night"))
        .stdout(predicate::str::contains("Location: Blue Note"))
        .stdout(predicate::str::contains("Doors open at seven."));

    eventdeck(home.path(), &server)
        .args(["events", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Event not found: nope"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mine_without_session_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(path("/api/events/user/my-events"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    eventdeck(home.path(), &server)
        .args(["events", "mine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication required"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_reports_missing_fields_without_request() {
    let server = MockServer::start().await;
    Mock::given(path("/api/events"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path());

    eventdeck(home.path(), &server)
        .args(["events", "add", "--title", "Jazz Night", "--price", "$40"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Missing required fields: short description, full description, date, location, category",
        ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_sends_bearer_and_prints_toast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(json!({
            "title": "Jazz Night",
            "shortDesc": "A night out",
            "category": "Music"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "event": event_json("e9", "Jazz Night", "Music")
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path());

    eventdeck(home.path(), &server)
        .args([
            "events",
            "add",
            "--title",
            "Jazz Night",
            "--short-desc",
            "A night out",
            "--full-desc",
            "Doors open at seven.",
            "--price",
            "$40",
            "--date",
            "Sep 12, 2026",
            "--location",
            "Blue Note",
            "--category",
            "music",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Event added successfully!"))
        .stdout(predicate::str::contains("e9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_sends_only_given_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/events/e1"))
        .and(body_partial_json(json!({ "price": "$50" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path());

    eventdeck(home.path(), &server)
        .args(["events", "update", "e1", "--price", "$50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Event updated successfully!"));

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({ "price": "$50" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_requires_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/user/my-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event_json("e1", "Jazz Night", "Music"), event_json("e2", "Food Fair", "Food")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/events/e1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path());

    // No answer on stdin means no.
    eventdeck(home.path(), &server)
        .args(["events", "delete", "e1"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Delete 'Jazz Night'?"))
        .stdout(predicate::str::contains("Delete cancelled."));

    eventdeck(home.path(), &server)
        .args(["events", "delete", "e1"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Event deleted successfully!"))
        .stdout(predicate::str::contains("Food Fair"))
        .stdout(predicate::str::contains("e1").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_surfaces_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/user/my-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "events": [] })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/events/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Event not found" })))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_session(home.path());

    eventdeck(home.path(), &server)
        .args(["events", "delete", "gone", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Event not found"));
}

//! End-to-end tests against the mock Confluence server.
//!
//! # Design
//! Each test starts its own mock server on a random port, on a background
//! tokio runtime, and drives the blocking client against it over real HTTP.

use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;

use confluence_client::{
    ApiError, ApiErrorDetail, Client, Content, Error, Storage, Version,
};
use mock_server::MockConfig;
use serde::{Deserialize, Serialize};
use url::Url;

const USER: &str = "ops@acme.test";
const TOKEN: &str = "s3cret";
const CONTENT: &str = "wiki/rest/api/content";

fn spawn_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, MockConfig::new(USER, TOKEN)).await
        })
        .unwrap();
    });

    addr
}

/// Answers exactly one request with `status_line`, `content_type` and the
/// raw `body` bytes, ignoring what was sent.
fn spawn_raw_responder(status_line: &'static str, content_type: &'static str, body: Vec<u8>) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
        }
        let mut stream = reader.into_inner();
        let head = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
    });

    addr
}

fn client_for(addr: SocketAddr, token: &str) -> Client {
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    Client::with_base_url(base, USER, token)
}

fn client() -> Client {
    client_for(spawn_server(), TOKEN)
}

fn api_error(err: Error) -> ApiError {
    match err {
        Error::Api(api) => api,
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Label {
    prefix: String,
    name: String,
    weight: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Echo<T> {
    method: String,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    body: T,
}

#[test]
fn content_lifecycle() {
    let client = client();

    // Step 1: create a page.
    let page = Content::page("ENG", "Runbook", "<p>v1</p>");
    let created: Content = client.post(CONTENT, &page).unwrap();
    let id = created.id.clone().expect("server assigns an id");
    assert_eq!(created.title, "Runbook");
    assert_eq!(created.version, Some(Version { number: 1 }));
    let path = format!("{CONTENT}/{id}");

    // Step 2: read it back.
    let fetched: Content = client.get(&path).unwrap();
    assert_eq!(fetched, created);

    // Step 3: update with the next version.
    let mut update = fetched.clone();
    update.title = "Runbook (edited)".to_string();
    update.body.as_mut().unwrap().storage = Storage::new("<p>v2</p>");
    update.version = Some(Version { number: 2 });
    let updated: Content = client.put(&path, &update).unwrap();
    assert_eq!(updated.title, "Runbook (edited)");
    assert_eq!(updated.version, Some(Version { number: 2 }));

    // Step 4: update again, ignoring the response body.
    update.version = Some(Version { number: 3 });
    client.put_discard(&path, &update).unwrap();

    // Step 5: the public link points at the same site without credentials.
    let link = client.url(&created.web_path().unwrap());
    assert!(link.ends_with(&format!("/wiki/spaces/ENG/pages/{id}")));
    assert!(!link.contains(TOKEN));

    // Step 6: delete, then reads and deletes fail with the server's message.
    client.delete(&path).unwrap();

    let err = api_error(client.get::<Content>(&path).unwrap_err());
    assert_eq!(err.status, 404);
    let text = err.to_string();
    assert!(text.contains(&format!("GET {path}")));
    assert!(text.contains(&format!("No content found with id: {id}")));

    let err = api_error(client.delete(&path).unwrap_err());
    assert!(err.to_string().contains(&format!("DELETE {path}")));
}

#[test]
fn stale_version_surfaces_conflict_message() {
    let client = client();
    let created: Content = client
        .post(CONTENT, &Content::page("ENG", "Runbook", ""))
        .unwrap();
    let path = format!("{CONTENT}/{}", created.id.as_deref().unwrap());

    let mut stale = created.clone();
    stale.version = Some(Version { number: 1 });
    let err = api_error(client.put::<_, Content>(&path, &stale).unwrap_err());

    assert_eq!(err.status, 409);
    let text = err.to_string();
    assert!(text.starts_with("409 Conflict"));
    assert!(text.contains("Current version is: 1"));
    assert!(text.contains(r#""version":{"number":1}"#), "request body is included");
}

#[test]
fn validation_errors_are_listed() {
    let client = client();
    let body = serde_json::json!({"type": "page"});
    let err = api_error(client.post::<_, Content>(CONTENT, &body).unwrap_err());

    assert_eq!(err.status, 400);
    assert!(matches!(&err.detail, ApiErrorDetail::Payload(p) if p.message.as_deref() == Some("Could not create content")));
    let text = err.to_string();
    assert!(text.contains(&format!("POST {CONTENT}\n{{\"type\":\"page\"}}")));
    assert!(text.contains("Valid: false"));
    assert!(text.contains("\n  * A title is required\n  * A space key is required"));
}

#[test]
fn wrong_credentials_are_rejected_without_leaking_token() {
    let client = client_for(spawn_server(), "not-the-token");
    let err = api_error(client.get::<Content>(&format!("{CONTENT}/1")).unwrap_err());

    assert_eq!(err.status, 401);
    let text = err.to_string();
    assert!(text.contains("Client must be authenticated"));
    assert!(text.contains("Authorized: false"));
    assert!(!text.contains("not-the-token"));
}

#[test]
fn non_json_error_body_is_reported_not_swallowed() {
    let client = client();
    let err = api_error(
        client
            .get::<serde_json::Value>("wiki/rest/api/broken")
            .unwrap_err(),
    );

    assert_eq!(err.status, 500);
    assert!(matches!(err.detail, ApiErrorDetail::Undecodable(_)));
    let text = err.to_string();
    assert!(text.starts_with("500 Internal Server Error\n\nGET wiki/rest/api/broken\n"));
    assert!(text.contains("error body could not be decoded"));
}

#[test]
fn request_body_round_trips_through_echo() {
    let client = client();
    let label = Label {
        prefix: "global".to_string(),
        name: "runbook".to_string(),
        weight: None,
    };

    let echo: Echo<Label> = client.post("wiki/rest/api/echo", &label).unwrap();
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.content_type.as_deref(), Some("application/json"));
    assert_eq!(echo.body, label);

    let echo: Echo<Label> = client.put("wiki/rest/api/echo", &label).unwrap();
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.body, label);

    client.post_discard("wiki/rest/api/echo", &label).unwrap();
}

#[test]
fn bodiless_requests_send_no_content_type() {
    let client = client();

    let echo: Echo<Option<Label>> = client.get("wiki/rest/api/echo").unwrap();
    assert_eq!(echo.method, "GET");
    assert!(echo.content_type.is_none());
    assert!(echo.body.is_none());

    client.delete("wiki/rest/api/echo").unwrap();
}

#[test]
fn success_body_with_wrong_shape_is_a_deserialization_error() {
    let client = client();
    let err = client.get::<Content>("wiki/rest/api/echo").unwrap_err();
    assert!(matches!(err, Error::Deserialization(_)));
}

#[test]
fn off_site_path_is_rejected_before_sending() {
    let client = client();
    let err = client
        .get::<serde_json::Value>("http://example.invalid/wiki")
        .unwrap_err();
    assert!(matches!(err, Error::PathResolution { .. }));
}

#[test]
fn connection_failure_is_a_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(addr, TOKEN);

    let err = client.get::<Content>(&format!("{CONTENT}/1")).unwrap_err();
    match err {
        Error::Transport { method, url, .. } => {
            assert_eq!(method, confluence_client::Method::Get);
            assert_eq!(url, format!("http://{addr}/{CONTENT}/1"));
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
}

#[test]
fn client_is_shared_across_threads() {
    let client = client();
    let created: Content = client
        .post(CONTENT, &Content::page("ENG", "Shared", ""))
        .unwrap();
    let path = format!("{CONTENT}/{}", created.id.as_deref().unwrap());

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| client.get::<Content>(&path).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().title, "Shared");
        }
    });
}

#[test]
fn non_utf8_error_body_is_an_api_error() {
    let addr = spawn_raw_responder("502 Bad Gateway", "text/html; charset=latin1", vec![b'<', 0xff, 0xfe, b'>']);
    let client = client_for(addr, TOKEN);

    let err = api_error(client.get::<serde_json::Value>("wiki/x").unwrap_err());
    assert_eq!(err.status, 502);
    assert!(matches!(err.detail, ApiErrorDetail::Undecodable(_)));
    let text = err.to_string();
    assert!(text.starts_with("502 Bad Gateway\n\nGET wiki/x\n"));
    assert!(text.contains("error body could not be decoded"));
}

#[test]
fn large_success_body_is_read_in_full() {
    let payload = "a".repeat(11 * 1024 * 1024);
    let body = serde_json::to_vec(&payload).unwrap();
    let addr = spawn_raw_responder("200 OK", "application/json", body);
    let client = client_for(addr, TOKEN);

    let value: String = client.get("wiki/x").unwrap();
    assert_eq!(value.len(), payload.len());
}

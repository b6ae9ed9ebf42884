use std::time::Duration;

use assetflow::reload::server::{inject_client, MAX_REQUEST_HEAD};
use assetflow::reload::{DevServer, LiveReload, ReloadKind};
use assetflow_test_utils::builders::write_file;
use assetflow_test_utils::{init_tracing, with_timeout};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

async fn send_raw(server: &DevServer, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

async fn request(server: &DevServer, method: &str, path: &str) -> String {
    let head = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    send_raw(server, head.as_bytes()).await
}

async fn get(server: &DevServer, path: &str) -> String {
    request(server, "GET", path).await
}

#[tokio::test]
async fn html_pages_get_the_client_script() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "index.html", "<html><body><p>hi</p></body></html>");
    let server = DevServer::start(dir.path(), "127.0.0.1", 0).await.unwrap();

    let response = with_timeout(get(&server, "/")).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"), "got {response}");
    assert!(response.contains("text/html"));
    assert!(response.contains("<p>hi</p><script src=\"/__assetflow/client.js\"></script></body>"));
}

#[tokio::test]
async fn static_files_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "assets/css/style.css", ".a{}");
    let server = DevServer::start(dir.path(), "127.0.0.1", 0).await.unwrap();

    let css = with_timeout(get(&server, "/assets/css/style.css?v=1")).await;
    assert!(css.starts_with("HTTP/1.1 200 OK"));
    assert!(css.contains("text/css"));
    assert!(css.ends_with(".a{}"));

    let missing = with_timeout(get(&server, "/nope.css")).await;
    assert!(missing.starts_with("HTTP/1.1 404"));

    let escape = with_timeout(get(&server, "/../secret")).await;
    assert!(escape.starts_with("HTTP/1.1 403"));

    let client = with_timeout(get(&server, "/__assetflow/client.js")).await;
    assert!(client.contains("EventSource"));
}

#[tokio::test]
async fn viewers_receive_reload_events() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let server = DevServer::start(dir.path(), "127.0.0.1", 0).await.unwrap();

    let stream = TcpStream::connect(server.local_addr()).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    writer
        .write_all(b"GET /__assetflow/events HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut lines = BufReader::new(reader).lines();

    with_timeout(async {
        while let Some(line) = lines.next_line().await.unwrap() {
            if line == ": connected" {
                break;
            }
        }
    })
    .await;
    assert_eq!(server.viewer_count(), 1);

    server.push(ReloadKind::InjectCss(vec!["assets/css/style.css".into()]));
    server.push(ReloadKind::Full);

    let mut received = Vec::new();
    with_timeout(async {
        while received.len() < 4 {
            let line = lines.next_line().await.unwrap().unwrap();
            if !line.is_empty() {
                received.push(line);
            }
        }
    })
    .await;
    assert_eq!(
        received,
        vec![
            "event: css",
            "data: assets/css/style.css",
            "event: reload",
            "data: full",
        ]
    );

    server.shutdown();
    let rest = tokio::time::timeout(Duration::from_secs(2), async {
        let mut rest = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            rest.push(line);
        }
        rest
    })
    .await
    .expect("stream did not close after shutdown");
    // Only the blank line terminating the last event remains.
    assert!(rest.iter().all(String::is_empty), "got {rest:?}");
}

#[tokio::test]
async fn percent_encoded_paths_are_decoded() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "my page.html", "<body>spaced</body>");
    write_file(dir.path(), "assets/css/caf\u{e9}.css", ".c{}");
    let server = DevServer::start(dir.path(), "127.0.0.1", 0).await.unwrap();

    let page = with_timeout(get(&server, "/my%20page.html")).await;
    assert!(page.starts_with("HTTP/1.1 200 OK"), "got {page}");
    assert!(page.contains("spaced"));

    let css = with_timeout(get(&server, "/assets/css/caf%C3%A9.css")).await;
    assert!(css.starts_with("HTTP/1.1 200 OK"), "got {css}");

    // Decoding happens before the traversal check.
    let escape = with_timeout(get(&server, "/%2e%2e/secret")).await;
    assert!(escape.starts_with("HTTP/1.1 403"), "got {escape}");

    let invalid = with_timeout(get(&server, "/%FF.html")).await;
    assert!(invalid.starts_with("HTTP/1.1 400"), "got {invalid}");
}

#[tokio::test]
async fn head_requests_get_headers_only() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "app.js", "console.log(1);");
    let server = DevServer::start(dir.path(), "127.0.0.1", 0).await.unwrap();

    let response = with_timeout(request(&server, "HEAD", "/app.js")).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"), "got {response}");
    assert!(response.contains("Content-Length: 15\r\n"), "got {response}");
    assert!(response.ends_with("\r\n\r\n"), "got {response}");
    assert_eq!(server.viewer_count(), 0);
}

#[tokio::test]
async fn oversized_request_head_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = DevServer::start(dir.path(), "127.0.0.1", 0).await.unwrap();

    // Exactly the limit, with the terminating blank line still missing.
    let prefix = "GET / HTTP/1.1\r\nX-Padding: ";
    let padding = "a".repeat(MAX_REQUEST_HEAD - prefix.len() - 2);
    let head = format!("{prefix}{padding}\r\n");
    assert_eq!(head.len(), MAX_REQUEST_HEAD);

    let response = with_timeout(send_raw(&server, head.as_bytes())).await;

    assert!(response.starts_with("HTTP/1.1 431"), "got {response}");
}

#[test]
fn client_is_injected_before_closing_body_or_appended() {
    let tag = "<script src=\"/__assetflow/client.js\"></script>";

    assert_eq!(
        inject_client("<body>x</body></html>"),
        format!("<body>x{tag}</body></html>")
    );
    assert_eq!(inject_client("<p>x</p>"), format!("<p>x</p>{tag}"));
}

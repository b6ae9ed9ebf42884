// src/reload/server.rs

//! Development HTTP server with server-sent reload events.
//!
//! Serves a static directory. HTML pages get a small client script injected
//! that subscribes to [`EVENTS_PATH`] and either swaps stylesheets (`css`
//! events) or reloads the page (`reload` events).

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::errors::{AssetflowError, Result};
use crate::reload::{LiveReload, ReloadKind};

pub const EVENTS_PATH: &str = "/__assetflow/events";
pub const CLIENT_PATH: &str = "/__assetflow/client.js";

/// Upper bound on the request line plus headers, in bytes.
pub const MAX_REQUEST_HEAD: usize = 16 * 1024;

const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/__assetflow/events");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("css", function (event) {
    var changed = event.data.split(",").map(function (p) {
      return p.split("/").pop();
    });
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    Array.prototype.forEach.call(links, function (link) {
      var href = (link.getAttribute("href") || "").split("?")[0];
      var name = href.split("/").pop();
      if (changed.indexOf(name) !== -1) {
        link.setAttribute("href", href + "?assetflow=" + Date.now());
      }
    });
  });
})();
"#;

/// A running dev server. Dropping the handle stops it.
#[derive(Debug)]
pub struct DevServer {
    addr: SocketAddr,
    events: broadcast::Sender<ReloadKind>,
    shutdown: broadcast::Sender<()>,
}

impl DevServer {
    /// Bind `host:port` and start serving `base_dir`. Port 0 picks a free
    /// port; see [`local_addr`](Self::local_addr).
    pub async fn start(base_dir: impl Into<PathBuf>, host: &str, port: u16) -> Result<Self> {
        let base_dir = base_dir.into();
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            AssetflowError::ConfigError(format!("cannot bind dev server to {host}:{port}: {e}"))
        })?;
        let addr = listener.local_addr()?;

        let (events, _) = broadcast::channel(64);
        let (shutdown, shutdown_rx) = broadcast::channel(1);

        let server = Arc::new(ServerState {
            base_dir,
            events: events.clone(),
            shutdown: shutdown.clone(),
        });
        tokio::spawn(accept_loop(listener, server, shutdown_rx));

        info!(%addr, "dev server listening");
        Ok(Self {
            addr,
            events,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of browsers currently subscribed to reload events.
    pub fn viewer_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl LiveReload for DevServer {
    fn push(&self, kind: ReloadKind) {
        debug!(?kind, viewers = self.viewer_count(), "pushing reload");
        // No subscribers is not an error.
        let _ = self.events.send(kind);
    }

    fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

struct ServerState {
    base_dir: PathBuf,
    events: broadcast::Sender<ReloadKind>,
    shutdown: broadcast::Sender<()>,
}

async fn accept_loop(
    listener: TcpListener,
    server: Arc<ServerState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "dev server accept failed");
                        continue;
                    }
                };
                let server = Arc::clone(&server);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, &server).await {
                        debug!(%peer, error = %err, "dev server connection ended");
                    }
                });
            }
        }
    }
    info!("dev server stopped");
}

async fn handle_connection(stream: TcpStream, server: &ServerState) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader.take(MAX_REQUEST_HEAD as u64)).lines();

    let Some(request_line) = lines.next_line().await? else {
        return Ok(());
    };
    let mut complete = false;
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            complete = true;
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let head_only = method == "HEAD";
    let mut out = Responder {
        writer: &mut writer,
        head_only,
    };

    if !complete {
        let exhausted = lines.get_ref().get_ref().limit() == 0;
        let status = if exhausted {
            "431 Request Header Fields Too Large"
        } else {
            "400 Bad Request"
        };
        return out.send(status, "text/plain", b"bad request").await;
    }

    let target = parts.next().unwrap_or("/");
    let raw_path = target.split(['?', '#']).next().unwrap_or("/");
    let Ok(path) = percent_decode_str(raw_path).decode_utf8() else {
        return out.send("400 Bad Request", "text/plain", b"bad request").await;
    };
    debug!(method, path = %path, "dev server request");

    if method != "GET" && !head_only {
        return out
            .send("405 Method Not Allowed", "text/plain", b"method not allowed")
            .await;
    }

    match &*path {
        EVENTS_PATH if !head_only => stream_events(&mut *out.writer, server).await,
        EVENTS_PATH => out.send("200 OK", "text/event-stream", b"").await,
        CLIENT_PATH => {
            out.send("200 OK", "application/javascript", CLIENT_SCRIPT.as_bytes())
                .await
        }
        _ => serve_file(&mut out, &server.base_dir, &path).await,
    }
}

async fn stream_events<W>(writer: &mut W, server: &ServerState) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut events = server.events.subscribe();
    let mut shutdown = server.shutdown.subscribe();

    writer
        .write_all(
            b"HTTP/1.1 200 OK\r\n\
              Content-Type: text/event-stream\r\n\
              Cache-Control: no-cache\r\n\
              Connection: keep-alive\r\n\r\n\
              : connected\n\n",
        )
        .await?;
    writer.flush().await?;

    loop {
        let message = tokio::select! {
            _ = shutdown.recv() => break,
            event = events.recv() => match event {
                Ok(ReloadKind::InjectCss(paths)) => format!("event: css\ndata: {}\n\n", paths.join(",")),
                Ok(ReloadKind::Full) => "event: reload\ndata: full\n\n".to_string(),
                // Missed events; a full reload is always correct.
                Err(broadcast::error::RecvError::Lagged(_)) => "event: reload\ndata: full\n\n".to_string(),
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };
        writer.write_all(message.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

async fn serve_file<W>(out: &mut Responder<'_, W>, base_dir: &Path, url_path: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let relative = Path::new(url_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return out.send("403 Forbidden", "text/plain", b"forbidden").await;
    }

    let mut file = base_dir.join(relative);
    if file.is_dir() {
        file = file.join("index.html");
    }

    let body = match tokio::fs::read(&file).await {
        Ok(body) => body,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return out.send("404 Not Found", "text/plain", b"not found").await;
        }
        Err(err) => return Err(AssetflowError::io_at(&file, err)),
    };

    let content_type = content_type(&file);
    if content_type.starts_with("text/html") {
        let html = inject_client(&String::from_utf8_lossy(&body));
        out.send("200 OK", content_type, html.as_bytes()).await
    } else {
        out.send("200 OK", content_type, &body).await
    }
}

/// Insert the reload client before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_PATH}\"></script>");
    match html.rfind("</body>") {
        Some(idx) => format!("{}{tag}{}", &html[..idx], &html[idx..]),
        None => format!("{html}{tag}"),
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Writes single-shot responses; `HEAD` requests get the headers only.
struct Responder<'w, W> {
    writer: &'w mut W,
    head_only: bool,
}

impl<W: AsyncWrite + Unpin> Responder<'_, W> {
    async fn send(&mut self, status: &str, content_type: &str, body: &[u8]) -> Result<()> {
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        self.writer.write_all(head.as_bytes()).await?;
        if !self.head_only {
            self.writer.write_all(body).await?;
        }
        self.writer.flush().await?;
        Ok(())
    }
}

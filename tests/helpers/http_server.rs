//! Minimal HTTP/1.1 server for registry and download tests.
//!
//! Serves canned responses keyed by request path and records every path it
//! was asked for. Each connection handles one request and is then closed.

// These methods are shared across multiple test binaries but not all tests use every method.
// Allow dead_code to suppress per-binary warnings.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A canned response.
#[derive(Debug, Clone)]
pub struct Route {
    status: u16,
    body: Vec<u8>,
    /// Advertised `Content-Length`; larger than `body` simulates a dropped transfer.
    content_length: usize,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status: 200,
            content_length: body.len(),
            body,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_length: 0,
        }
    }

    /// Send `body` but advertise `content_length` bytes, then hang up.
    pub fn truncated(body: impl Into<Vec<u8>>, content_length: usize) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_length,
        }
    }
}

pub struct TestServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start serving `routes` (path -> response) on an ephemeral port.
    /// Unknown paths get 404.
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = serve(socket, &routes, &recorded).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
            task,
        }
    }

    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:1234`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Paths requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut socket: TcpStream,
    routes: &HashMap<String, Route>,
    recorded: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    recorded.lock().unwrap().push(path.clone());

    let route = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Route::status(404));
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        if route.status == 200 { "OK" } else { "Error" },
        route.content_length
    );
    socket.write_all(header.as_bytes()).await?;
    socket.write_all(&route.body).await?;
    socket.flush().await?;
    socket.shutdown().await
}

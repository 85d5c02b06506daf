//! Loopback HTTP server answering canned responses for end-to-end tests.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use texedit_config::BackendEndpoint;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Response served for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    status: u16,
    body: String,
}

impl CannedResponse {
    /// Success response carrying `body`.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    /// Response with an explicit status code.
    #[must_use]
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A request observed by [`FakeBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedRequest {
    /// HTTP method, e.g. `POST`.
    pub method: String,
    /// Request target, e.g. `/api/tone`.
    pub path: String,
    /// Header names lowercased, in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    /// Value of the first header called `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let wanted = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == wanted)
            .map(|(_, value)| value.as_str())
    }
}

type Routes = Arc<HashMap<String, CannedResponse>>;
type Journal = Arc<Mutex<Vec<ReceivedRequest>>>;

/// Minimal HTTP/1.1 server bound to an ephemeral loopback port.
///
/// Routes are keyed by `"<METHOD> <path>"`, for example `"GET /health"`.
/// Unknown routes answer 404. Every connection serves one request.
#[derive(Debug)]
pub struct FakeBackend {
    address: SocketAddr,
    requests: Journal,
    task: JoinHandle<()>,
}

impl FakeBackend {
    /// Binds the listener and starts serving `routes`.
    ///
    /// # Errors
    ///
    /// Returns an error when the listener cannot be bound.
    pub async fn spawn<I, K>(routes: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = (K, CannedResponse)>,
        K: Into<String>,
    {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let address = listener.local_addr()?;
        let routes: Routes = Arc::new(
            routes
                .into_iter()
                .map(|(route, response)| (route.into(), response))
                .collect(),
        );
        let requests: Journal = Arc::new(Mutex::new(Vec::new()));
        let journal = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let connection_routes = Arc::clone(&routes);
                let connection_journal = Arc::clone(&journal);
                tokio::spawn(async move {
                    if let Err(error) =
                        serve_connection(stream, &connection_routes, &connection_journal).await
                    {
                        tracing::debug!(%error, "fake backend connection failed");
                    }
                });
            }
        });
        Ok(Self {
            address,
            requests,
            task,
        })
    }

    /// Endpoint clients should use to reach this server.
    #[must_use]
    pub fn endpoint(&self) -> BackendEndpoint {
        BackendEndpoint::http("127.0.0.1", self.address.port())
    }

    /// Requests served so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(stream: TcpStream, routes: &Routes, journal: &Journal) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(());
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            let key = name.trim().to_ascii_lowercase();
            let header_value = value.trim().to_owned();
            if key == "content-length" {
                content_length = header_value.parse().unwrap_or_default();
            }
            headers.push((key, header_value));
        }
    }

    let mut body = vec![0_u8; content_length];
    reader.read_exact(&mut body).await?;

    let route = format!("{method} {path}");
    let response = routes
        .get(&route)
        .cloned()
        .unwrap_or_else(|| CannedResponse::with_status(404, r#"{"error":"not found"}"#));
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(ReceivedRequest {
            method,
            path,
            headers,
            body,
        });

    let reason = if (200..300).contains(&response.status) {
        "OK"
    } else {
        "Error"
    };
    let reply = format!(
        concat!(
            "HTTP/1.1 {} {}\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: {}\r\n",
            "Connection: close\r\n\r\n{}",
        ),
        response.status,
        reason,
        response.body.len(),
        response.body
    );
    let mut socket = reader.into_inner();
    socket.write_all(reply.as_bytes()).await?;
    socket.shutdown().await
}

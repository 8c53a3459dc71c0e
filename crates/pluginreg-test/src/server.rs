//! Minimal HTTP/1.1 server for exercising the real GitHub client.
//!
//! Serves a fixed route table from a background thread. Every response
//! carries `Connection: close`, so each request arrives on its own
//! connection. Requests are recorded for later inspection.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::debug;

/// A canned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResponse {
    /// Status code.
    pub status: u16,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl TestResponse {
    /// `200 OK` with `body`.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, body)
    }

    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::ok(value.to_string()).with_header("Content-Type", "application/json")
    }

    /// Any status with `body`.
    #[must_use]
    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `302 Found` pointing at `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        Self::status(302, Vec::new()).with_header("Location", location)
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A request the server received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Request method.
    pub method: String,
    /// Path including the query string.
    pub path: String,
    /// Headers, names lowercased.
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    /// First value of header `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
struct Shared {
    routes: HashMap<String, TestResponse>,
    requests: Vec<RecordedRequest>,
}

/// Route-table HTTP server running on a loopback port.
///
/// Routes match on the full path and query first, then on the path alone.
/// Unknown routes get `404` with a GitHub-style JSON error body. The server
/// runs until the process exits.
#[derive(Debug, Clone)]
pub struct TestServer {
    base: String,
    shared: Arc<Mutex<Shared>>,
}

impl TestServer {
    /// Bind to a free loopback port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub fn start() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let shared = Arc::new(Mutex::new(Shared::default()));

        let accept_shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let shared = Arc::clone(&accept_shared);
                thread::spawn(move || handle(stream, &shared));
            }
        });

        Ok(Self {
            base: format!("http://127.0.0.1:{port}/"),
            shared,
        })
    }

    /// Base URL, ending in `/`.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.base
    }

    /// Absolute URL for `path` (leading `/` optional).
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// Serve `response` for `path`, replacing any earlier route.
    pub fn route(&self, path: &str, response: TestResponse) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.routes.insert(path.to_string(), response);
        }
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared
            .lock()
            .map(|s| s.requests.clone())
            .unwrap_or_default()
    }
}

fn handle(mut stream: TcpStream, shared: &Mutex<Shared>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let Some(request) = read_request(&mut stream) else {
        return;
    };
    debug!(method = %request.method, path = %request.path, "test server request");

    let response = {
        let Ok(mut shared) = shared.lock() else {
            return;
        };
        let path_only = request.path.split('?').next().unwrap_or_default();
        let response = shared
            .routes
            .get(&request.path)
            .or_else(|| shared.routes.get(path_only))
            .cloned()
            .unwrap_or_else(|| {
                TestResponse::status(404, r#"{"message":"Not Found"}"#)
                    .with_header("Content-Type", "application/json")
            });
        shared.requests.push(request);
        response
    };

    let _ = write_response(&mut stream, &response);
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => data.extend_from_slice(buf.get(..n)?),
        }
    }
    parse_request(std::str::from_utf8(&data).ok()?)
}

fn parse_request(raw: &str) -> Option<RecordedRequest> {
    let mut lines = raw.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers = lines
        .map(str::trim)
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    Some(RecordedRequest {
        method,
        path,
        headers,
    })
}

fn write_response(stream: &mut TcpStream, response: &TestResponse) -> io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url_path: &str, server: &TestServer) -> String {
        let addr = server.url().trim_start_matches("http://").trim_end_matches('/');
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "GET {url_path} HTTP/1.1\r\nHost: {addr}\r\nX-Test: yes\r\n\r\n"
        )
        .unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_serves_routes_and_records() {
        let server = TestServer::start().unwrap();
        server.route("/hello", TestResponse::ok("world"));

        let response = get("/hello?x=1", &server);

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("\r\n\r\nworld"));
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/hello?x=1");
        assert_eq!(requests[0].header("X-TEST"), Some("yes"));
    }

    #[test]
    fn test_exact_query_route_wins() {
        let server = TestServer::start().unwrap();
        server.route("/f", TestResponse::ok("any"));
        server.route("/f?ref=v1", TestResponse::ok("v1"));

        assert!(get("/f?ref=v1", &server).ends_with("v1"));
        assert!(get("/f?ref=v2", &server).ends_with("any"));
    }

    #[test]
    fn test_unknown_route_is_github_404() {
        let server = TestServer::start().unwrap();
        let response = get("/missing", &server);

        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with(r#"{"message":"Not Found"}"#));
    }

    #[test]
    fn test_url_for() {
        let server = TestServer::start().unwrap();
        assert_eq!(server.url_for("/a/b"), format!("{}a/b", server.url()));
    }
}

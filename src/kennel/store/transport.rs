use crate::error::{KennelError, Result};
use std::io::Read;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "kennel";
const ACCEPT: &str = "application/vnd.github.v3+json";

/// Largest response body accepted: a 100 MB file (GitHub's limit) served
/// base64-encoded by the blob endpoint.
pub const MAX_BODY_BYTES: u64 = 140 * 1024 * 1024;

/// Status and body of a completed HTTP exchange, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The two HTTP verbs the remote store needs.
///
/// `Err` means the request never completed (DNS, TLS, timeout). Any response
/// the server produced, including 4xx/5xx, comes back as `Ok`.
pub trait Transport {
    fn get(&self, url: &str, token: Option<&str>) -> Result<HttpResponse>;

    fn put(&self, url: &str, token: &str, body: &serde_json::Value) -> Result<HttpResponse>;
}

/// Blocking HTTPS transport over `ureq`.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

/// Read a body of at most `limit` bytes. Larger bodies are an error rather
/// than a truncated document.
fn read_body(reader: impl Read, limit: u64) -> Result<String> {
    let mut body = String::new();
    reader
        .take(limit + 1)
        .read_to_string(&mut body)
        .map_err(|e| KennelError::Transport(format!("failed to read body: {e}")))?;
    if body.len() as u64 > limit {
        return Err(KennelError::Transport(format!(
            "response body exceeds {} MB",
            limit / 1024 / 1024
        )));
    }
    Ok(body)
}

fn into_response(result: std::result::Result<ureq::Response, ureq::Error>) -> Result<HttpResponse> {
    match result {
        Ok(resp) => {
            let status = resp.status();
            let body = read_body(resp.into_reader(), MAX_BODY_BYTES)?;
            Ok(HttpResponse { status, body })
        }
        Err(ureq::Error::Status(status, resp)) => {
            let body = read_body(resp.into_reader(), MAX_BODY_BYTES).unwrap_or_default();
            Ok(HttpResponse { status, body })
        }
        Err(ureq::Error::Transport(transport)) => {
            Err(KennelError::Transport(transport.to_string()))
        }
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str, token: Option<&str>) -> Result<HttpResponse> {
        debug!(url, authenticated = token.is_some(), "GET");
        let mut request = self
            .agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", ACCEPT);
        if let Some(token) = token {
            request = request.set("Authorization", &format!("token {token}"));
        }
        into_response(request.call())
    }

    fn put(&self, url: &str, token: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        debug!(url, "PUT");
        let request = self
            .agent
            .put(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", ACCEPT)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("token {token}"));
        into_response(request.send_string(&body.to_string()))
    }
}

impl<T: Transport + ?Sized> Transport for std::rc::Rc<T> {
    fn get(&self, url: &str, token: Option<&str>) -> Result<HttpResponse> {
        (**self).get(url, token)
    }

    fn put(&self, url: &str, token: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        (**self).put(url, token, body)
    }
}

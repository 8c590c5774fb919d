use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};
pub use mutual_shared::protocol::HttpMethod;

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::VecDeque;

// =========================================================
// HTTP interface abstraction
// =========================================================

/// A single file sent as `multipart/form-data`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Json(String),
    Multipart(FilePart),
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<HttpBody>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(HttpBody::Json(body.to_string()));
        self
    }

    pub fn with_file(mut self, part: FilePart) -> Self {
        self.body = Some(HttpBody::Multipart(part));
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body. An empty body (204) decodes as JSON `null`, so `()` works.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(ClientError::from)
    }
}

/// Transport seam. `?Send` because the client runs on a single UI thread.
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse>;
}

#[async_trait::async_trait(?Send)]
impl<C: HttpClient + ?Sized> HttpClient for Rc<C> {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        (**self).send(req).await
    }
}

// =========================================================
// Production client: reqwest
// =========================================================

#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait(?Send)]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        let mut builder = self.client.request(method, &req.url);

        for (k, v) in &req.headers {
            builder = builder.header(k, v);
        }

        match req.body {
            Some(HttpBody::Json(body)) => {
                builder = builder
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body);
            }
            Some(HttpBody::Multipart(part)) => {
                let file = reqwest::multipart::Part::bytes(part.bytes)
                    .file_name(part.file_name)
                    .mime_str(&part.content_type)?;
                builder = builder.multipart(reqwest::multipart::Form::new().part(part.field, file));
            }
            None => {}
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ClientError::from(e).in_op_with("http.send", req.url.clone()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ClientError::from(e).in_op_with("http.read_body", req.url.clone()))?;

        Ok(HttpResponse { status, body })
    }
}

// =========================================================
// Test tooling: MockHttpClient
// =========================================================

#[cfg(test)]
#[derive(Debug, Clone)]
pub enum MockReply {
    Status(u16, String),
    NetworkDown,
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<HttpBody>,
}

#[cfg(test)]
impl RecordedRequest {
    pub fn json_body(&self) -> Option<serde_json::Value> {
        match &self.body {
            Some(HttpBody::Json(s)) => serde_json::from_str(s).ok(),
            _ => None,
        }
    }
}

/// Canned replies keyed by `METHOD url-without-query`. Queued replies are
/// served in order; the last one keeps answering.
#[cfg(test)]
pub struct MockHttpClient {
    responses: RefCell<HashMap<String, VecDeque<MockReply>>>,
    pub requests: RefCell<Vec<RecordedRequest>>,
    barrier: RefCell<Option<Rc<tokio::sync::Barrier>>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
            barrier: RefCell::new(None),
        }
    }

    fn key(method: HttpMethod, url: &str) -> String {
        let path = url.split('?').next().unwrap_or(url);
        format!("{} {}", method.as_str(), path)
    }

    pub fn mock_response(&self, method: HttpMethod, url: &str, status: u16, body: serde_json::Value) {
        self.push(method, url, MockReply::Status(status, body.to_string()));
    }

    /// Non-JSON or empty bodies (e.g. a 204).
    pub fn push_raw(&self, method: HttpMethod, url: &str, status: u16, body: &str) {
        self.push(method, url, MockReply::Status(status, body.to_string()));
    }

    pub fn mock_network_error(&self, method: HttpMethod, url: &str) {
        self.push(method, url, MockReply::NetworkDown);
    }

    fn push(&self, method: HttpMethod, url: &str, reply: MockReply) {
        self.responses
            .borrow_mut()
            .entry(Self::key(method, url))
            .or_default()
            .push_back(reply);
    }

    /// Holds every response until `n` requests are in flight together.
    pub fn hold_until_concurrent(&self, n: usize) {
        *self.barrier.borrow_mut() = Some(Rc::new(tokio::sync::Barrier::new(n)));
    }

    pub fn release_hold(&self) {
        self.barrier.borrow_mut().take();
    }

    pub fn count(&self, method: HttpMethod, url: &str) -> usize {
        let key = Self::key(method, url);
        self.requests
            .borrow()
            .iter()
            .filter(|r| Self::key(r.method, &r.url) == key)
            .count()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.borrow().last().cloned()
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        self.requests.borrow_mut().push(RecordedRequest {
            url: req.url.clone(),
            method: req.method,
            headers: req.headers.clone(),
            body: req.body.clone(),
        });

        let barrier = self.barrier.borrow().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        let reply = {
            let mut responses = self.responses.borrow_mut();
            responses
                .get_mut(&Self::key(req.method, &req.url))
                .and_then(|queue| {
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                })
        };

        match reply {
            Some(MockReply::Status(status, body)) => Ok(HttpResponse { status, body }),
            Some(MockReply::NetworkDown) => Err(ClientError::network("connection refused")),
            None => Ok(HttpResponse {
                status: 404,
                body: r#"{"detail": "Not Found"}"#.to_string(),
            }),
        }
    }
}

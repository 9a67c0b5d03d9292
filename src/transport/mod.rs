//! HTTP transport module.
//!
//! The client never opens sockets itself. It hands one [`HttpRequest`] at a
//! time to a [`Transport`] and classifies the [`HttpResponse`] it gets back.
//! Transports report I/O failures as errors and return every HTTP status,
//! including 4xx and 5xx, as a response.

mod reqwest_transport;

pub use reqwest_transport::{ReqwestTransport, TransportConfig, DEFAULT_REQUEST_TIMEOUT};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

use crate::content::{self, ContentType};
use crate::errors::ClientResult;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET request.
    Get,
    /// HEAD request.
    Head,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// PATCH request.
    Patch,
    /// DELETE request.
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An outbound request. Cloned once per attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Creates a request, validating the URL.
    pub fn new(method: Method, url: &str) -> ClientResult<Self> {
        Ok(Self {
            method,
            url: Url::parse(url)?,
            headers: HashMap::new(),
            body: None,
        })
    }

    /// Creates a GET request.
    pub fn get(url: &str) -> ClientResult<Self> {
        Self::new(Method::Get, url)
    }

    /// Creates a POST request.
    pub fn post(url: &str) -> ClientResult<Self> {
        Self::new(Method::Post, url)
    }

    /// Creates a PUT request.
    pub fn put(url: &str) -> ClientResult<Self> {
        Self::new(Method::Put, url)
    }

    /// Creates a DELETE request.
    pub fn delete(url: &str) -> ClientResult<Self> {
        Self::new(Method::Delete, url)
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Encodes `value` as JSON and sets the matching headers.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> ClientResult<Self> {
        self.encoded(ContentType::Json, value)
    }

    /// Encodes `value` as XML and sets the matching headers.
    pub fn xml<T: Serialize + ?Sized>(self, value: &T) -> ClientResult<Self> {
        self.encoded(ContentType::Xml, value)
    }

    fn encoded<T: Serialize + ?Sized>(
        self,
        content_type: ContentType,
        value: &T,
    ) -> ClientResult<Self> {
        let body = content::encode(content_type, value)?;
        Ok(self
            .header("Content-Type", content_type.mime())
            .header("Accept", content_type.mime())
            .body(body))
    }

    /// Returns a header value, matching the name case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Returns a header value, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns the `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns true for statuses below 400.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// A single-call HTTP transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the response, whatever its status.
    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(Method::Get), reqwest::Method::GET);
        assert_eq!(reqwest::Method::from(Method::Head), reqwest::Method::HEAD);
        assert_eq!(reqwest::Method::from(Method::Post), reqwest::Method::POST);
        assert_eq!(reqwest::Method::from(Method::Put), reqwest::Method::PUT);
        assert_eq!(reqwest::Method::from(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(
            reqwest::Method::from(Method::Delete),
            reqwest::Method::DELETE
        );
    }

    #[test]
    fn test_request_rejects_invalid_url() {
        assert!(HttpRequest::get("not a url").is_err());
        assert!(HttpRequest::get("http://localhost:8080/ok").is_ok());
    }

    #[test]
    fn test_json_request_sets_headers() {
        #[derive(Serialize)]
        struct Body {
            abc: u32,
        }

        let request = HttpRequest::post("http://localhost/items")
            .unwrap()
            .json(&Body { abc: 123 })
            .unwrap();

        assert_eq!(request.header_value("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(&b"{\"abc\":123}"[..]));
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("Retry-After".to_string(), "3".to_string());
        let response = HttpResponse {
            status: 429,
            headers,
            body: Bytes::new(),
        };

        assert_eq!(response.header("retry-after"), Some("3"));
        assert_eq!(response.content_type(), None);
        assert!(!response.is_success());
    }
}

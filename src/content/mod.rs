//! Content negotiation for request and response bodies.
//!
//! Only JSON and XML are supported. The format is picked from a
//! `Content-Type` (or `Accept`) header under a [`ContentTypePolicy`] that is
//! part of the client configuration.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{ClientError, ClientResult};

/// A supported body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `application/json`
    Json,
    /// `application/xml`
    Xml,
}

impl ContentType {
    /// Returns the canonical MIME type.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Xml => "application/xml",
        }
    }

    /// Picks a format for a header value under `policy`.
    ///
    /// With [`ContentTypePolicy::JsonOrXml`], an `xml` subtype or `+xml`
    /// suffix selects XML and everything else, including a missing header,
    /// selects JSON.
    pub fn negotiate(header: Option<&str>, policy: ContentTypePolicy) -> Self {
        match policy {
            ContentTypePolicy::JsonOnly => ContentType::Json,
            ContentTypePolicy::XmlOnly => ContentType::Xml,
            ContentTypePolicy::JsonOrXml => match header {
                Some(value) if is_xml(value) => ContentType::Xml,
                _ => ContentType::Json,
            },
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime())
    }
}

/// Which formats the client will negotiate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentTypePolicy {
    /// Pick JSON or XML from the header.
    #[default]
    JsonOrXml,
    /// Always JSON.
    JsonOnly,
    /// Always XML.
    XmlOnly,
}

impl ContentTypePolicy {
    /// Parses a policy name: `json`, `xml`, or anything else for both.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => ContentTypePolicy::JsonOnly,
            "xml" => ContentTypePolicy::XmlOnly,
            _ => ContentTypePolicy::JsonOrXml,
        }
    }
}

fn is_xml(header: &str) -> bool {
    match header.parse::<mime::Mime>() {
        Ok(parsed) => parsed.subtype() == mime::XML || parsed.suffix() == Some(mime::XML),
        Err(_) => header.to_ascii_lowercase().contains("xml"),
    }
}

/// Decodes `body` as `content_type` into `T`.
pub fn decode<T: DeserializeOwned>(content_type: ContentType, body: &[u8]) -> ClientResult<T> {
    let decode_error = |message: String| ClientError::Decode {
        content_type: content_type.mime().to_string(),
        message,
    };

    match content_type {
        ContentType::Json => serde_json::from_slice(body).map_err(|e| decode_error(e.to_string())),
        ContentType::Xml => {
            let text = std::str::from_utf8(body).map_err(|e| decode_error(e.to_string()))?;
            quick_xml::de::from_str(text).map_err(|e| decode_error(e.to_string()))
        }
    }
}

/// Encodes `value` as `content_type`.
pub fn encode<T: Serialize + ?Sized>(content_type: ContentType, value: &T) -> ClientResult<Bytes> {
    match content_type {
        ContentType::Json => serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| ClientError::Encode {
                message: e.to_string(),
            }),
        ContentType::Xml => quick_xml::se::to_string(value)
            .map(Bytes::from)
            .map_err(|e| ClientError::Encode {
                message: e.to_string(),
            }),
    }
}

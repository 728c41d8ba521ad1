//! Core data models used throughout API Harness.
//!
//! These types describe configured sources, the endpoints extracted from
//! their documents, and the per-source outcome of one ingestion pass.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Where a source document lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Http,
}

impl SourceKind {
    /// Classify a locator: `http://` and `https://` URLs are remote, anything
    /// else is a local path.
    pub fn from_locator(locator: &str) -> Self {
        let lower = locator.trim_start().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceKind::Http
        } else {
            SourceKind::File
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            SourceKind::File => "file",
            SourceKind::Http => "http",
        })
    }
}

/// One configured origin of endpoint data.
///
/// Created once per configuration load and replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// Unique name across the source set.
    pub name: String,
    /// File path or URL.
    pub locator: String,
    pub kind: SourceKind,
    /// Extra request headers (HTTP sources only).
    pub headers: BTreeMap<String, String>,
    pub description: String,
}

/// Document format, resolved once at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecVersion {
    #[serde(rename = "swagger-2.0")]
    SwaggerV2,
    #[serde(rename = "openapi-3.0")]
    OpenApiV3,
    #[serde(rename = "openapi-3.1")]
    OpenApiV3_1,
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpecVersion::SwaggerV2 => "Swagger 2.0",
            SpecVersion::OpenApiV3 => "OpenAPI 3.0",
            SpecVersion::OpenApiV3_1 => "OpenAPI 3.1",
        };
        f.write_str(label)
    }
}

/// Document-level metadata taken from the `info` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecInfo {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub spec_version: SpecVersion,
}

/// A single operation (path + method) extracted from a document.
///
/// Only `path`, `method`, `summary`, `description`, and `tags` are indexed;
/// the remaining fields are carried through to callers untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub path: String,
    /// Upper-case HTTP method (`GET`, `POST`, ...).
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

impl Endpoint {
    /// Minimal endpoint with only a method and path set.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into().to_ascii_uppercase(),
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            parameters: None,
            request_body: None,
            responses: None,
            deprecated: false,
        }
    }
}

/// Output of a successful document parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub info: SpecInfo,
    pub endpoints: Vec<Endpoint>,
}

/// Failure classes for a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseErrorKind {
    InvalidFormat,
    NetworkError,
    FileNotFound,
    CircularReference,
    Unknown,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParseErrorKind::InvalidFormat => "invalid format",
            ParseErrorKind::NetworkError => "network error",
            ParseErrorKind::FileNotFound => "file not found",
            ParseErrorKind::CircularReference => "circular reference",
            ParseErrorKind::Unknown => "unknown error",
        };
        f.write_str(label)
    }
}

/// Result of ingesting one source during one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Success {
        endpoints: Vec<Endpoint>,
        info: SpecInfo,
    },
    Failure {
        kind: ParseErrorKind,
        detail: String,
    },
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success { .. })
    }

    /// Endpoints of a successful outcome; empty for failures.
    pub fn endpoints(&self) -> &[Endpoint] {
        match self {
            SourceOutcome::Success { endpoints, .. } => endpoints,
            SourceOutcome::Failure { .. } => &[],
        }
    }
}

impl From<ParsedDocument> for SourceOutcome {
    fn from(doc: ParsedDocument) -> Self {
        SourceOutcome::Success {
            endpoints: doc.endpoints,
            info: doc.info,
        }
    }
}

/// An endpoint tagged with the name of the source that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedEndpoint {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub source_name: String,
}

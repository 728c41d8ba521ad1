//! Document parser: source descriptor → endpoint list.
//!
//! The [`DocumentParser`] trait is the seam between the ingestion pipeline
//! and whatever turns a source into endpoints. [`OpenApiParser`] is the
//! built-in implementation:
//!
//! ```text
//! fetch (file | http) ─▶ decode (JSON | YAML) ─▶ detect version
//!                        ─▶ resolve local $refs ─▶ extract endpoints
//! ```
//!
//! Failures surface as [`ParseError`] with a [`ParseErrorKind`]. Errors from
//! other parser implementations are classified by [`classify_failure`].

mod document;
mod refs;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use api_harness_core::models::{ParseErrorKind, ParsedDocument, SourceDescriptor, SourceKind};

pub use document::{detect_version, extract_document};

/// A structured parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub detail: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::InvalidFormat, detail)
    }

    /// Recover a structured error from an arbitrary parser failure.
    ///
    /// A [`ParseError`] anywhere in the chain keeps its kind; anything else
    /// is classified from its message.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(pe) = err.chain().find_map(|e| e.downcast_ref::<ParseError>()) {
            return pe.clone();
        }
        let detail = format!("{:#}", err);
        Self::new(classify_failure(&detail), detail)
    }
}

/// Best-effort classification of a failure message.
pub fn classify_failure(message: &str) -> ParseErrorKind {
    let msg = message.to_lowercase();
    if msg.contains("circular") {
        ParseErrorKind::CircularReference
    } else if msg.contains("no such file") || msg.contains("enoent") || msg.contains("not found")
    {
        ParseErrorKind::FileNotFound
    } else if msg.contains("timed out")
        || msg.contains("timeout")
        || msg.contains("connect")
        || msg.contains("network")
        || msg.contains("dns")
        || msg.contains("http")
    {
        ParseErrorKind::NetworkError
    } else if msg.contains("invalid")
        || msg.contains("parse")
        || msg.contains("yaml")
        || msg.contains("json")
        || msg.contains("expected")
    {
        ParseErrorKind::InvalidFormat
    } else {
        ParseErrorKind::Unknown
    }
}

/// Turns one source into a parsed document.
///
/// Implementations must not touch shared state: the ingestion pipeline
/// calls `parse` for every source of a pass concurrently.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, source: &SourceDescriptor) -> Result<ParsedDocument>;
}

/// The built-in OpenAPI / Swagger parser.
pub struct OpenApiParser {
    client: reqwest::Client,
}

impl OpenApiParser {
    /// Create a parser. Requests carry no timeout of their own; the
    /// ingestion pass bounds each source with the configured fetch timeout,
    /// which a reload may change.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("api-harness/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, source: &SourceDescriptor) -> Result<String, ParseError> {
        match source.kind {
            SourceKind::File => read_local(&source.locator).await,
            SourceKind::Http => self.fetch_remote(source).await,
        }
    }

    async fn fetch_remote(&self, source: &SourceDescriptor) -> Result<String, ParseError> {
        let mut headers = HeaderMap::new();
        for (k, v) in &source.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| ParseError::invalid(format!("invalid header name '{}': {}", k, e)))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| ParseError::invalid(format!("invalid header value for '{}': {}", k, e)))?;
            headers.insert(name, value);
        }

        let resp = self
            .client
            .get(&source.locator)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ParseError::new(ParseErrorKind::NetworkError, network_detail(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ParseError::new(
                ParseErrorKind::NetworkError,
                format!("GET {} returned HTTP {}", source.locator, status),
            ));
        }

        resp.text()
            .await
            .map_err(|e| ParseError::new(ParseErrorKind::NetworkError, network_detail(&e)))
    }
}

#[async_trait]
impl DocumentParser for OpenApiParser {
    async fn parse(&self, source: &SourceDescriptor) -> Result<ParsedDocument> {
        let text = self.fetch(source).await?;
        let root = decode(&text)?;
        Ok(extract_document(&root)?)
    }
}

async fn read_local(path: &str) -> Result<String, ParseError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        let kind = if e.kind() == std::io::ErrorKind::NotFound {
            ParseErrorKind::FileNotFound
        } else {
            ParseErrorKind::Unknown
        };
        ParseError::new(kind, format!("{}: {}", path, e))
    })
}

fn network_detail(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

/// Decode JSON (text starting with `{`) or YAML into a JSON value.
pub fn decode(text: &str) -> Result<serde_json::Value, ParseError> {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.is_empty() {
        return Err(ParseError::invalid("document is empty"));
    }
    if trimmed.starts_with('{') {
        serde_json::from_str(trimmed)
            .map_err(|e| ParseError::invalid(format!("invalid JSON: {}", e)))
    } else {
        serde_yaml::from_str(trimmed)
            .map_err(|e| ParseError::invalid(format!("invalid YAML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn file_source(locator: &str) -> SourceDescriptor {
        SourceDescriptor {
            name: "t".into(),
            locator: locator.into(),
            kind: SourceKind::File,
            headers: BTreeMap::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure("ENOENT: no such file or directory"),
            ParseErrorKind::FileNotFound
        );
        assert_eq!(
            classify_failure("Circular $ref pointer found"),
            ParseErrorKind::CircularReference
        );
        assert_eq!(
            classify_failure("error sending request: connection refused"),
            ParseErrorKind::NetworkError
        );
        assert_eq!(
            classify_failure("Unexpected token in JSON at position 3"),
            ParseErrorKind::InvalidFormat
        );
        assert_eq!(classify_failure("something odd"), ParseErrorKind::Unknown);
    }

    #[test]
    fn test_from_anyhow_keeps_structured_kind() {
        let err: anyhow::Error =
            ParseError::new(ParseErrorKind::CircularReference, "#/a -> #/a").into();
        let err = err.context("while parsing source");
        let pe = ParseError::from_anyhow(&err);
        assert_eq!(pe.kind, ParseErrorKind::CircularReference);
        assert_eq!(pe.detail, "#/a -> #/a");
    }

    #[test]
    fn test_decode_json_and_yaml() {
        let json = decode(r#"{"openapi": "3.0.0"}"#).unwrap();
        assert_eq!(json["openapi"], "3.0.0");
        let yaml = decode("openapi: 3.1.0\ninfo:\n  title: T\n").unwrap();
        assert_eq!(yaml["info"]["title"], "T");
        assert_eq!(
            decode("{ not json").unwrap_err().kind,
            ParseErrorKind::InvalidFormat
        );
        assert_eq!(decode("   ").unwrap_err().kind, ParseErrorKind::InvalidFormat);
    }

    #[tokio::test]
    async fn test_missing_file_is_file_not_found() {
        let parser = OpenApiParser::new().unwrap();
        let err = parser
            .parse(&file_source("/no/such/dir/spec.yaml"))
            .await
            .unwrap_err();
        assert_eq!(ParseError::from_anyhow(&err).kind, ParseErrorKind::FileNotFound);
    }

    #[tokio::test]
    async fn test_parses_local_yaml_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("spec.yaml");
        std::fs::write(
            &path,
            "openapi: 3.0.3\ninfo:\n  title: Pets\n  version: '1.0'\npaths:\n  /pets:\n    get:\n      summary: List pets\n",
        )
        .unwrap();
        let parser = OpenApiParser::new().unwrap();
        let doc = parser
            .parse(&file_source(path.to_str().unwrap()))
            .await
            .unwrap();
        assert_eq!(doc.info.title, "Pets");
        assert_eq!(doc.endpoints.len(), 1);
        assert_eq!(doc.endpoints[0].method, "GET");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let parser = OpenApiParser::new().unwrap();
        let source = SourceDescriptor {
            name: "remote".into(),
            locator: "http://127.0.0.1:1/openapi.json".into(),
            kind: SourceKind::Http,
            headers: BTreeMap::new(),
            description: String::new(),
        };
        let err = parser.parse(&source).await.unwrap_err();
        assert_eq!(ParseError::from_anyhow(&err).kind, ParseErrorKind::NetworkError);
    }
}

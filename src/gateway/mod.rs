//! API gateway — the sole mediator of network I/O.
//!
//! One operation per backend capability, exactly one HTTP round-trip per
//! call. No retries and no caching live here: recovery policy belongs to the
//! callers (registry, upload pipeline, session), which keeps this layer a
//! pure transport shim with normalized request and error shapes.

pub mod http;
pub mod mock;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{Document, DocumentId, FilePayload};

pub use http::HttpGateway;
pub use mock::MockGateway;

/// Normalized transport failure.
///
/// Every variant renders to a reason string fit for direct display; the
/// components fold these into their own `Failed(reason)` states.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("cannot reach the server at {0}")]
    Connection(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("server returned HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail provided"))]
    Http {
        status: u16,
        /// Server-supplied human-readable reason, when the body carried one.
        detail: Option<String>,
    },

    #[error("malformed server response: {0}")]
    Decode(String),

    #[error("network error: {0}")]
    Transport(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl GatewayError {
    /// HTTP status class (4 for client errors, 5 for server errors), when
    /// the failure reached the server at all.
    pub fn status_class(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(status / 100),
            _ => None,
        }
    }
}

/// One operation per backend capability. Implemented by [`HttpGateway`] for
/// the live service and [`MockGateway`] for tests.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>, GatewayError>;

    async fn upload_document(
        &self,
        file: &FilePayload,
        user_id: &str,
    ) -> Result<Document, GatewayError>;

    async fn delete_document(&self, document_id: &DocumentId) -> Result<(), GatewayError>;

    async fn summarize(&self, document_id: &DocumentId) -> Result<String, GatewayError>;

    async fn ask(&self, question: &str, document_id: &DocumentId)
        -> Result<String, GatewayError>;

    async fn sections(&self, document_id: &DocumentId) -> Result<String, GatewayError>;
}

// ── Wire shapes ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SectionsResponse {
    pub sections: String,
}

/// Failure bodies from the backend carry `{"detail": ...}`; pull out the
/// human-readable part when present.
pub(crate) fn parse_error_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_extracted_from_string_body() {
        let detail = parse_error_detail(r#"{"detail": "Document not found"}"#);
        assert_eq!(detail.as_deref(), Some("Document not found"));
    }

    #[test]
    fn structured_detail_rendered_as_json() {
        let detail = parse_error_detail(r#"{"detail": {"code": 7}}"#);
        assert_eq!(detail.as_deref(), Some(r#"{"code":7}"#));
    }

    #[test]
    fn non_json_body_yields_no_detail() {
        assert!(parse_error_detail("<html>502 Bad Gateway</html>").is_none());
        assert!(parse_error_detail(r#"{"message": "nope"}"#).is_none());
    }

    #[test]
    fn http_error_display_includes_detail() {
        let err = GatewayError::Http {
            status: 404,
            detail: Some("Document not found".into()),
        };
        assert_eq!(err.to_string(), "server returned HTTP 404: Document not found");
    }

    #[test]
    fn http_error_display_without_detail() {
        let err = GatewayError::Http {
            status: 502,
            detail: None,
        };
        assert_eq!(err.to_string(), "server returned HTTP 502: no detail provided");
    }

    #[test]
    fn status_class_only_for_http_failures() {
        let err = GatewayError::Http {
            status: 404,
            detail: None,
        };
        assert_eq!(err.status_class(), Some(4));
        assert_eq!(GatewayError::Timeout(30).status_class(), None);
    }
}

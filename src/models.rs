//! Core data types shared across the gateway and the orchestration components.

use std::fmt;

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque backend-assigned document identifier.
///
/// The live backend issues numeric ids, but callers must not depend on that:
/// the id is carried as an opaque string and serialized back onto the wire in
/// the shape it arrived (numeric when the value parses as an integer).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => DocumentId(n.to_string()),
            Raw::Str(s) => DocumentId(s),
        })
    }
}

/// A backend-acknowledged uploaded document.
///
/// Only the backend assigns ids; a document without one never enters the
/// registry. `summary` is absent until fetched and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub original_filename: String,
    pub upload_date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Who produced a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Question,
    Answer,
}

/// One transcript entry. Questions and answers alternate chronologically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn question(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Question,
            text: text.into(),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Answer,
            text: text.into(),
        }
    }
}

/// A candidate file for upload: binary payload plus declared metadata.
///
/// The payload is reference-counted, so cloning a `FilePayload` (and
/// resubmitting a failed attempt) never copies the file contents.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

impl FilePayload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The declared MIME type, or a guess from the filename extension.
    pub fn resolved_mime(&self) -> String {
        if let Some(mime) = &self.mime_type {
            return mime.clone();
        }
        mime_guess::from_path(&self.filename)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_deserializes_from_integer() {
        let id: DocumentId = serde_json::from_str("42").unwrap();
        assert_eq!(id, DocumentId::from("42"));
    }

    #[test]
    fn document_id_deserializes_from_string() {
        let id: DocumentId = serde_json::from_str("\"doc-42\"").unwrap();
        assert_eq!(id.as_str(), "doc-42");
    }

    #[test]
    fn numeric_id_serializes_back_as_number() {
        let json = serde_json::to_string(&DocumentId::from("42")).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn non_numeric_id_serializes_as_string() {
        let json = serde_json::to_string(&DocumentId::from("doc-42")).unwrap();
        assert_eq!(json, "\"doc-42\"");
    }

    #[test]
    fn document_deserializes_backend_shape() {
        // Numeric id and Python datetime format, as the document service emits.
        let doc: Document = serde_json::from_str(
            r#"{"id": 7, "original_filename": "contract.pdf", "upload_date": "2024-01-15T10:30:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(doc.id, DocumentId::from("7"));
        assert_eq!(doc.original_filename, "contract.pdf");
        assert!(doc.summary.is_none());
    }

    #[test]
    fn resolved_mime_prefers_declared_type() {
        let file = FilePayload::new("scan.bin", vec![1, 2, 3]).with_mime_type("image/png");
        assert_eq!(file.resolved_mime(), "image/png");
    }

    #[test]
    fn resolved_mime_guesses_from_extension() {
        let file = FilePayload::new("report.pdf", vec![1, 2, 3]);
        assert_eq!(file.resolved_mime(), "application/pdf");
    }

    #[test]
    fn resolved_mime_falls_back_to_octet_stream() {
        let file = FilePayload::new("mystery", vec![1]);
        assert_eq!(file.resolved_mime(), "application/octet-stream");
    }

    #[test]
    fn payload_clones_share_backing_storage() {
        let file = FilePayload::new("report.pdf", vec![7u8; 1024]);
        let copy = file.clone();
        assert_eq!(file.bytes.as_ptr(), copy.bytes.as_ptr());
        assert_eq!(copy.size_bytes(), 1024);
    }

    #[test]
    fn turn_helpers_tag_roles() {
        assert_eq!(Turn::question("q").role, TurnRole::Question);
        assert_eq!(Turn::answer("a").role, TurnRole::Answer);
    }
}

//! reqwest-backed gateway against the live backend services.

use std::time::Duration;

use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{
    parse_error_detail, AnswerResponse, Gateway, GatewayError, SectionsResponse, SummaryResponse,
};
use crate::config::ApiConfig;
use crate::models::{Document, DocumentId, FilePayload};

/// HTTP client for the document and RAG services, plus a thin passthrough to
/// the external identity service.
///
/// Cheap to clone: the underlying connection pool is shared.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    bearer_token: Option<String>,
    request_timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: ApiConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::ClientBuild(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url,
            bearer_token: config.bearer_token,
            request_timeout_secs: config.request_timeout_secs,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn map_transport(&self, err: reqwest::Error) -> GatewayError {
        if err.is_connect() {
            GatewayError::Connection(self.base_url.clone())
        } else if err.is_timeout() {
            GatewayError::Timeout(self.request_timeout_secs)
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    /// One round-trip: send, normalize failures, decode the success body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                detail: parse_error_detail(&body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Like [`execute`](Self::execute) for operations whose success body is a
    /// bare acknowledgement we do not decode.
    async fn execute_ack(&self, request: reqwest::RequestBuilder) -> Result<(), GatewayError> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                detail: parse_error_detail(&body),
            });
        }
        Ok(())
    }

    // ── Identity passthrough ────────────────────────────────
    // The identity payload shape is owned by the external auth service, so
    // these return untyped JSON rather than inventing a schema for it.

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let body = json!({ "username": username, "password": password });
        self.execute(self.client.post(self.url("/auth/login")).json(&body))
            .await
    }

    pub async fn signup(
        &self,
        profile: &serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.execute(self.client.post(self.url("/auth/signup")).json(profile))
            .await
    }

    pub async fn logout(&self, token: &str) -> Result<(), GatewayError> {
        let body = json!({ "token": token });
        self.execute_ack(self.client.post(self.url("/auth/logout")).json(&body))
            .await
    }
}

impl Gateway for HttpGateway {
    async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>, GatewayError> {
        tracing::debug!(user_id, "listing documents");
        let path = format!("/document/documents/{user_id}");
        self.execute(self.client.get(self.url(&path))).await
    }

    async fn upload_document(
        &self,
        file: &FilePayload,
        user_id: &str,
    ) -> Result<Document, GatewayError> {
        tracing::debug!(
            filename = %file.filename,
            size_bytes = file.size_bytes(),
            "uploading document"
        );
        // `Bytes` clones are refcounted, so retries never copy the payload.
        let part = multipart::Part::stream(reqwest::Body::from(file.bytes.clone()))
            .file_name(file.filename.clone())
            .mime_str(&file.resolved_mime())
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("user_id", user_id.to_string());

        self.execute(self.client.post(self.url("/document/upload")).multipart(form))
            .await
    }

    async fn delete_document(&self, document_id: &DocumentId) -> Result<(), GatewayError> {
        tracing::debug!(%document_id, "deleting document");
        // Wire shape confirmed only for list/upload; deletion is addressed
        // alongside the list route. See DESIGN.md.
        let path = format!("/document/documents/{document_id}");
        self.execute_ack(self.client.delete(self.url(&path))).await
    }

    async fn summarize(&self, document_id: &DocumentId) -> Result<String, GatewayError> {
        tracing::debug!(%document_id, "requesting summary");
        let path = format!("/rag/summarize/{document_id}");
        let response: SummaryResponse = self.execute(self.client.post(self.url(&path))).await?;
        Ok(response.summary)
    }

    async fn ask(
        &self,
        question: &str,
        document_id: &DocumentId,
    ) -> Result<String, GatewayError> {
        tracing::debug!(%document_id, "submitting question");
        let body = json!({ "text": question, "document_id": document_id });
        let response: AnswerResponse = self
            .execute(self.client.post(self.url("/rag/ask")).json(&body))
            .await?;
        Ok(response.answer)
    }

    async fn sections(&self, document_id: &DocumentId) -> Result<String, GatewayError> {
        tracing::debug!(%document_id, "requesting section breakdown");
        let path = format!("/rag/sections/{document_id}");
        let response: SectionsResponse = self.execute(self.client.get(self.url(&path))).await?;
        Ok(response.sections)
    }
}

//! Upload pipeline — validation plus serialized single-file submission.
//!
//! One attempt at a time: Selected → Validating → Uploading →
//! Succeeded/Failed. Validation failures never touch the network. A failed
//! attempt keeps the selection so the caller can retry with the same file; a
//! successful one clears it. The returned document is the backend's canonical
//! shape — hand it to the registry's `append` instead of paying for a full
//! list refresh.

use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{Document, FilePayload};

/// MIME types the backend can ingest.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg"];

/// Lifecycle of the current attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadStatus {
    Idle,
    Selected,
    Validating,
    Uploading,
    Succeeded { document: Document },
    Failed { reason: String },
}

/// Client-side rejection, decided before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no file selected")]
    NoFileSelected,

    #[error("only one file may be uploaded per attempt ({0} selected)")]
    MultipleFiles(usize),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("an upload is already in progress")]
    Busy,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("internal lock error")]
    LockPoisoned,
}

pub struct UploadPipeline<G> {
    gateway: G,
    selection: Mutex<Vec<FilePayload>>,
    status_tx: watch::Sender<UploadStatus>,
}

impl<G: Gateway> UploadPipeline<G> {
    pub fn new(gateway: G) -> Self {
        let (status_tx, _) = watch::channel(UploadStatus::Idle);
        Self {
            gateway,
            selection: Mutex::new(Vec::new()),
            status_tx,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.status_tx.subscribe()
    }

    /// Stage a candidate selection, discarding any prior outcome.
    ///
    /// The selection is not validated here; `submit` validates so that a bad
    /// selection surfaces as a Failed attempt, not a silent drop.
    pub fn select(&self, files: Vec<FilePayload>) {
        if let Ok(mut selection) = self.selection.lock() {
            *selection = files;
        }
        self.status_tx.send_replace(UploadStatus::Selected);
    }

    /// Validate the staged selection and drive one upload to completion.
    ///
    /// Rejected with [`UploadError::Busy`] while another submit is in flight;
    /// rejected attempts are dropped, never queued.
    ///
    /// The busy guard is a status check with no atomic exchange: the
    /// one-upload-at-a-time guarantee holds on a current-thread runtime,
    /// where no suspension point separates the check from the transition to
    /// Uploading. Driving one pipeline from multiple threads requires
    /// external synchronization.
    pub async fn submit(&self, user_id: &str) -> Result<Document, UploadError> {
        if matches!(*self.status_tx.borrow(), UploadStatus::Uploading) {
            return Err(UploadError::Busy);
        }

        self.status_tx.send_replace(UploadStatus::Validating);
        let file = {
            let selection = self
                .selection
                .lock()
                .map_err(|_| UploadError::LockPoisoned)?;
            match validate(&selection) {
                Ok(file) => file.clone(),
                Err(err) => {
                    tracing::warn!(error = %err, "upload rejected before submission");
                    self.status_tx.send_replace(UploadStatus::Failed {
                        reason: err.to_string(),
                    });
                    return Err(err.into());
                }
            }
        };

        let attempt_id = Uuid::new_v4();
        tracing::info!(
            %attempt_id,
            filename = %file.filename,
            size_bytes = file.size_bytes(),
            "upload started"
        );
        self.status_tx.send_replace(UploadStatus::Uploading);

        match self.gateway.upload_document(&file, user_id).await {
            Ok(document) => {
                tracing::info!(%attempt_id, id = %document.id, "upload succeeded");
                if let Ok(mut selection) = self.selection.lock() {
                    selection.clear();
                }
                self.status_tx.send_replace(UploadStatus::Succeeded {
                    document: document.clone(),
                });
                Ok(document)
            }
            Err(err) => {
                // Selection kept: the attempt is retryable as-is.
                tracing::warn!(%attempt_id, error = %err, "upload failed");
                self.status_tx.send_replace(UploadStatus::Failed {
                    reason: err.to_string(),
                });
                Err(err.into())
            }
        }
    }
}

/// Exactly one file, with an accepted MIME type.
fn validate(selection: &[FilePayload]) -> Result<&FilePayload, ValidationError> {
    match selection {
        [] => Err(ValidationError::NoFileSelected),
        [file] => {
            let mime = file.resolved_mime();
            if ACCEPTED_MIME_TYPES.contains(&mime.as_str()) {
                Ok(file)
            } else {
                Err(ValidationError::UnsupportedType(mime))
            }
        }
        many => Err(ValidationError::MultipleFiles(many.len())),
    }
}

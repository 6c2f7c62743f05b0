//! Client-side orchestration core for the LexQuery legal-document Q&A
//! service.
//!
//! A user uploads a document, the backend extracts and indexes it, and the
//! user converses with it through natural-language questions. This crate is
//! the non-visual half of that client: the state machines tracking document
//! lists, uploads, summaries, and chat history, and the policy for how the
//! client talks to the backend. Rendering, routing, and identity issuance
//! live elsewhere; the core only consumes an opaque user id and an optional
//! bearer credential.
//!
//! Four components, front to back:
//!
//! - [`gateway`] — sole mediator of network I/O; normalized requests,
//!   responses, and error shapes. No retries, no caching.
//! - [`registry`] — authoritative in-memory document list, with lazy
//!   per-document summary caching.
//! - [`upload`] — file validation plus serialized single-file submission.
//! - [`session`] — per-document question/answer transcript with serialized
//!   question submission.
//!
//! The registry, pipeline, and session each call through the gateway and
//! never call each other; a UI consumer wires them together. Every component
//! exposes its status both as a snapshot and as a `tokio::sync::watch`
//! subscription, so a UI layer can re-render on change without the core
//! knowing anything about rendering.
//!
//! ```no_run
//! use lexquery_client::{
//!     ApiConfig, ConversationSession, DocumentId, DocumentRegistry, HttpGateway,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = HttpGateway::new(ApiConfig::from_env())?;
//!
//! let registry = DocumentRegistry::new(gateway.clone());
//! registry.refresh("user-1").await;
//!
//! let session = ConversationSession::new(gateway, DocumentId::from("42"));
//! session.ask("What is the termination clause?").await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod gateway;
pub mod models;
pub mod registry;
pub mod session;
pub mod upload;

pub use config::ApiConfig;
pub use gateway::{Gateway, GatewayError, HttpGateway, MockGateway};
pub use models::{Document, DocumentId, FilePayload, Turn, TurnRole};
pub use registry::{DocumentRegistry, RegistryError, RegistryStatus};
pub use session::{AskOutcome, AskRejection, ConversationSession, SessionStatus};
pub use upload::{UploadError, UploadPipeline, UploadStatus, ValidationError, ACCEPTED_MIME_TYPES};

/// Install a test subscriber so `RUST_LOG` surfaces component tracing while
/// debugging a failing test. Safe to call from every test; only the first
/// call wins.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

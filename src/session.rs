//! Conversation session — the question/answer transcript for one document.
//!
//! Questions are strictly serialized: the AwaitingAnswer guard rejects a new
//! ask until the prior one resolves, and rejected attempts are dropped, never
//! queued. A Question turn is appended synchronously on accept; its Answer
//! turn is appended only on success, so a failed request leaves the dangling
//! question visible without an orphan answer. The session retains only the
//! document id, never a reference into the registry.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::gateway::Gateway;
use crate::models::{DocumentId, Turn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    AwaitingAnswer,
    Failed { reason: String },
}

/// Why an ask was dropped without touching the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskRejection {
    EmptyQuestion,
    Busy,
}

/// Result of one `ask` call.
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    Answered(String),
    Rejected(AskRejection),
    Failed(String),
}

pub struct ConversationSession<G> {
    id: Uuid,
    document_id: DocumentId,
    gateway: G,
    transcript: Mutex<Vec<Turn>>,
    status_tx: watch::Sender<SessionStatus>,
}

impl<G: Gateway> ConversationSession<G> {
    pub fn new(gateway: G, document_id: DocumentId) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Idle);
        Self {
            id: Uuid::new_v4(),
            document_id,
            gateway,
            transcript: Mutex::new(Vec::new()),
            status_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Snapshot of the transcript, in chronological order.
    pub fn transcript(&self) -> Vec<Turn> {
        self.transcript
            .lock()
            .map(|turns| turns.clone())
            .unwrap_or_default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Submit a question against the session's document.
    ///
    /// Empty or whitespace-only questions, and asks issued while an answer is
    /// outstanding, are rejected as no-ops. A later successful ask clears a
    /// Failed status back to Idle. The question text is trimmed before it is
    /// recorded and submitted, so the transcript and the wire carry exactly
    /// the text the emptiness check saw.
    ///
    /// The in-flight guard is a status check with no atomic exchange: the
    /// serialization guarantee holds on a current-thread runtime, where no
    /// suspension point separates the check from the transition to
    /// AwaitingAnswer. Driving one session from multiple threads requires
    /// external synchronization.
    pub async fn ask(&self, question: &str) -> AskOutcome {
        let question = question.trim();
        if question.is_empty() {
            return AskOutcome::Rejected(AskRejection::EmptyQuestion);
        }
        if matches!(*self.status_tx.borrow(), SessionStatus::AwaitingAnswer) {
            tracing::debug!(session = %self.id, "ask rejected: answer outstanding");
            return AskOutcome::Rejected(AskRejection::Busy);
        }

        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.push(Turn::question(question));
        }
        self.status_tx.send_replace(SessionStatus::AwaitingAnswer);

        match self.gateway.ask(question, &self.document_id).await {
            Ok(answer) => {
                if let Ok(mut transcript) = self.transcript.lock() {
                    transcript.push(Turn::answer(answer.clone()));
                }
                self.status_tx.send_replace(SessionStatus::Idle);
                AskOutcome::Answered(answer)
            }
            Err(err) => {
                // The question turn stays; no orphan answer is added.
                let reason = err.to_string();
                tracing::warn!(session = %self.id, error = %reason, "ask failed");
                self.status_tx.send_replace(SessionStatus::Failed {
                    reason: reason.clone(),
                });
                AskOutcome::Failed(reason)
            }
        }
    }

    /// Discard the transcript and reset to Idle. Always legal; contacts
    /// nothing.
    pub fn clear(&self) {
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.clear();
        }
        self.status_tx.send_replace(SessionStatus::Idle);
        tracing::debug!(session = %self.id, "transcript cleared");
    }
}

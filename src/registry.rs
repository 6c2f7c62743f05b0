//! Document registry — the authoritative in-memory view of a user's
//! documents.
//!
//! The registry only ever holds backend-acknowledged documents. A refresh
//! replaces the sequence wholesale so the view always reflects exactly one
//! coherent backend snapshot; a failed refresh keeps the previous sequence
//! (stale data beats a blank screen). Deletion talks to the server first and
//! drops the local entry only on success, so the registry never shows a
//! document the server no longer has, and never silently loses one it still
//! does. Summaries are fetched lazily and cached per document id.
//!
//! Concurrent refreshes are not fenced by request id: the last response to
//! arrive wins. Accepted staleness risk for a user-driven, low-frequency
//! call pattern.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{Document, DocumentId};

/// Outcome of the most recent list fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RegistryStatus {
    Idle,
    Loading,
    Ready,
    Failed { reason: String },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("internal lock error")]
    LockPoisoned,
}

pub struct DocumentRegistry<G> {
    gateway: G,
    documents: Mutex<Vec<Document>>,
    summaries: Mutex<HashMap<DocumentId, String>>,
    status_tx: watch::Sender<RegistryStatus>,
}

impl<G: Gateway> DocumentRegistry<G> {
    pub fn new(gateway: G) -> Self {
        let (status_tx, _) = watch::channel(RegistryStatus::Idle);
        Self {
            gateway,
            documents: Mutex::new(Vec::new()),
            summaries: Mutex::new(HashMap::new()),
            status_tx,
        }
    }

    /// Snapshot of the current document sequence, in backend order.
    pub fn documents(&self) -> Vec<Document> {
        self.documents
            .lock()
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }

    pub fn status(&self) -> RegistryStatus {
        self.status_tx.borrow().clone()
    }

    /// Observe status transitions without polling.
    pub fn subscribe(&self) -> watch::Receiver<RegistryStatus> {
        self.status_tx.subscribe()
    }

    /// Re-fetch the document list and replace the sequence wholesale.
    ///
    /// On failure the previous sequence is untouched and the status carries
    /// the reason. Returns the resulting status for convenience.
    pub async fn refresh(&self, user_id: &str) -> RegistryStatus {
        self.status_tx.send_replace(RegistryStatus::Loading);

        // Built locally so the return value always reflects this call's own
        // outcome, even when an overlapping refresh overwrites the shared
        // status right after.
        let outcome = match self.gateway.list_documents(user_id).await {
            Ok(documents) => {
                let documents = dedup_by_id(documents);
                tracing::info!(user_id, count = documents.len(), "document list refreshed");
                if let Ok(mut current) = self.documents.lock() {
                    *current = documents;
                }
                RegistryStatus::Ready
            }
            Err(err) => {
                tracing::warn!(user_id, error = %err, "document list refresh failed");
                RegistryStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };
        self.status_tx.send_replace(outcome.clone());
        outcome
    }

    /// Delete a document server-side, then drop it locally.
    ///
    /// The local sequence is only touched after the server acknowledges, so
    /// a failed delete changes nothing.
    pub async fn remove(&self, document_id: &DocumentId) -> Result<(), RegistryError> {
        self.gateway.delete_document(document_id).await?;

        let mut documents = self
            .documents
            .lock()
            .map_err(|_| RegistryError::LockPoisoned)?;
        documents.retain(|doc| &doc.id != document_id);
        drop(documents);

        // Any cached summary for the document is stale now.
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.remove(document_id);
        }

        tracing::info!(%document_id, "document removed");
        Ok(())
    }

    /// Fetch a document's summary, serving from cache when possible.
    ///
    /// A cache hit performs no network call. A failed fetch leaves the cache
    /// unset so the next call retries.
    pub async fn fetch_summary(&self, document_id: &DocumentId) -> Result<String, RegistryError> {
        if let Some(cached) = self
            .summaries
            .lock()
            .map_err(|_| RegistryError::LockPoisoned)?
            .get(document_id)
            .cloned()
        {
            return Ok(cached);
        }

        let summary = self.gateway.summarize(document_id).await?;
        self.summaries
            .lock()
            .map_err(|_| RegistryError::LockPoisoned)?
            .insert(document_id.clone(), summary.clone());
        Ok(summary)
    }

    /// Fetch the model-formatted section breakdown for a document.
    ///
    /// Not cached: the backend recomputes sections on every call.
    pub async fn fetch_sections(&self, document_id: &DocumentId) -> Result<String, RegistryError> {
        Ok(self.gateway.sections(document_id).await?)
    }

    /// Insert a backend-acknowledged document without a full refresh.
    ///
    /// Entry point for upload results. An entry with the same id is replaced
    /// in place rather than duplicated.
    pub fn append(&self, document: Document) {
        if let Ok(mut documents) = self.documents.lock() {
            if let Some(existing) = documents.iter_mut().find(|doc| doc.id == document.id) {
                tracing::warn!(id = %document.id, "append replaced an existing registry entry");
                *existing = document;
            } else {
                documents.push(document);
            }
        }
    }
}

/// Keep the first occurrence of each id, preserving backend order.
fn dedup_by_id(documents: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(documents.len());
    for doc in documents {
        if seen.insert(doc.id.clone()) {
            unique.push(doc);
        } else {
            tracing::warn!(id = %doc.id, "backend returned a duplicate document id");
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use chrono::NaiveDate;

    fn doc(id: &str, filename: &str) -> Document {
        Document {
            id: DocumentId::from(id),
            original_filename: filename.to_string(),
            upload_date: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            summary: None,
        }
    }

    fn registry_with(gateway: &MockGateway) -> DocumentRegistry<MockGateway> {
        DocumentRegistry::new(gateway.clone())
    }

    #[tokio::test]
    async fn refresh_replaces_sequence_wholesale() {
        crate::init_test_tracing();
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);

        gateway.queue_list(Ok(vec![doc("1", "contract.pdf"), doc("2", "lease.pdf")]));
        let status = registry.refresh("user-1").await;
        assert_eq!(status, RegistryStatus::Ready);
        let docs = registry.documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, DocumentId::from("1"));
        assert_eq!(docs[1].id, DocumentId::from("2"));

        // A later snapshot fully replaces, never merges.
        gateway.queue_list(Ok(vec![doc("3", "deed.pdf")]));
        registry.refresh("user-1").await;
        let docs = registry.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, DocumentId::from("3"));
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_sequence() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);

        gateway.queue_list(Ok(vec![doc("1", "contract.pdf")]));
        registry.refresh("user-1").await;

        gateway.queue_list(Err(GatewayError::Connection("http://localhost:8000".into())));
        let status = registry.refresh("user-1").await;

        match status {
            RegistryStatus::Failed { reason } => {
                assert!(reason.contains("cannot reach the server"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(registry.documents().len(), 1);
    }

    #[tokio::test]
    async fn refresh_drops_duplicate_ids() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);

        gateway.queue_list(Ok(vec![
            doc("1", "contract.pdf"),
            doc("1", "contract-copy.pdf"),
            doc("2", "lease.pdf"),
        ]));
        registry.refresh("user-1").await;

        let docs = registry.documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].original_filename, "contract.pdf");
    }

    #[tokio::test]
    async fn overlapping_refreshes_each_return_their_own_outcome() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);
        // The first refresh is parked mid-flight; the second completes (and
        // fails) in the meantime, consuming the first scripted response.
        gateway.queue_list(Err(GatewayError::Timeout(300)));
        gateway.queue_list(Ok(vec![doc("1", "contract.pdf")]));
        gateway.hold_next_list();

        let slow = registry.refresh("user-1");
        let fast = async {
            let status = registry.refresh("user-1").await;
            gateway.release_list();
            status
        };
        let (slow, fast) = tokio::join!(slow, fast);

        // Each call reports its own result, not the other's.
        assert!(matches!(fast, RegistryStatus::Failed { .. }));
        assert_eq!(slow, RegistryStatus::Ready);
        // The shared status belongs to the last response to arrive.
        assert_eq!(registry.status(), RegistryStatus::Ready);
        assert_eq!(registry.documents().len(), 1);
    }

    #[tokio::test]
    async fn subscribe_observes_refresh_outcome() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);
        let rx = registry.subscribe();
        assert_eq!(*rx.borrow(), RegistryStatus::Idle);

        gateway.queue_list(Ok(vec![]));
        registry.refresh("user-1").await;
        assert_eq!(*rx.borrow(), RegistryStatus::Ready);
    }

    #[tokio::test]
    async fn remove_deletes_server_side_first() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);

        gateway.queue_list(Ok(vec![doc("1", "contract.pdf"), doc("2", "lease.pdf")]));
        registry.refresh("user-1").await;

        gateway.queue_delete(Ok(()));
        registry.remove(&DocumentId::from("1")).await.unwrap();

        assert_eq!(gateway.delete_calls(), 1);
        let docs = registry.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, DocumentId::from("2"));
    }

    #[tokio::test]
    async fn failed_remove_leaves_sequence_unchanged() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);

        gateway.queue_list(Ok(vec![doc("1", "contract.pdf")]));
        registry.refresh("user-1").await;

        gateway.queue_delete(Err(GatewayError::Http {
            status: 500,
            detail: Some("storage offline".into()),
        }));
        let err = registry.remove(&DocumentId::from("1")).await.unwrap_err();
        assert!(err.to_string().contains("storage offline"));
        assert_eq!(registry.documents().len(), 1);
    }

    #[tokio::test]
    async fn remove_then_refresh_never_reintroduces() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);

        gateway.queue_list(Ok(vec![doc("1", "contract.pdf"), doc("2", "lease.pdf")]));
        registry.refresh("user-1").await;

        gateway.queue_delete(Ok(()));
        registry.remove(&DocumentId::from("1")).await.unwrap();

        // Server snapshot after a successful delete no longer carries it.
        gateway.queue_list(Ok(vec![doc("2", "lease.pdf")]));
        registry.refresh("user-1").await;

        assert!(registry
            .documents()
            .iter()
            .all(|d| d.id != DocumentId::from("1")));
    }

    #[tokio::test]
    async fn fetch_summary_hits_cache_on_second_call() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);
        gateway.queue_summarize(Ok("A short lease agreement.".into()));

        let id = DocumentId::from("1");
        let first = registry.fetch_summary(&id).await.unwrap();
        let second = registry.fetch_summary(&id).await.unwrap();

        assert_eq!(first, "A short lease agreement.");
        assert_eq!(second, first);
        assert_eq!(gateway.summarize_calls(), 1);
    }

    #[tokio::test]
    async fn failed_summary_fetch_leaves_cache_unset() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);
        let id = DocumentId::from("1");

        gateway.queue_summarize(Err(GatewayError::Timeout(300)));
        assert!(registry.fetch_summary(&id).await.is_err());

        gateway.queue_summarize(Ok("Second attempt.".into()));
        assert_eq!(registry.fetch_summary(&id).await.unwrap(), "Second attempt.");
        assert_eq!(gateway.summarize_calls(), 2);
    }

    #[tokio::test]
    async fn summary_cache_is_per_document() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);
        gateway.queue_summarize(Ok("first doc".into()));
        gateway.queue_summarize(Ok("second doc".into()));

        assert_eq!(
            registry.fetch_summary(&DocumentId::from("1")).await.unwrap(),
            "first doc"
        );
        assert_eq!(
            registry.fetch_summary(&DocumentId::from("2")).await.unwrap(),
            "second doc"
        );
        assert_eq!(gateway.summarize_calls(), 2);
    }

    #[tokio::test]
    async fn append_adds_without_network() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);

        registry.append(doc("9", "report.pdf"));
        assert_eq!(registry.documents().len(), 1);
        assert_eq!(gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn append_replaces_same_id_instead_of_duplicating() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);

        registry.append(doc("9", "report.pdf"));
        registry.append(doc("9", "report-v2.pdf"));

        let docs = registry.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].original_filename, "report-v2.pdf");
    }

    #[tokio::test]
    async fn fetch_sections_passes_through_uncached() {
        let gateway = MockGateway::new();
        let registry = registry_with(&gateway);
        gateway.queue_sections(Ok("1. Parties\n2. Term".into()));
        gateway.queue_sections(Ok("1. Parties\n2. Term".into()));

        let id = DocumentId::from("1");
        registry.fetch_sections(&id).await.unwrap();
        registry.fetch_sections(&id).await.unwrap();
        assert_eq!(gateway.sections_calls(), 2);
    }
}

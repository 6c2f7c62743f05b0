//! Scripted gateway double.
//!
//! Responses are queued per operation and handed out in order; every call is
//! counted so tests can assert exactly how many round-trips an operation
//! performed (or that none happened at all). The hold gates park the next
//! ask, upload, or list call until released, for exercising the in-flight
//! guards and overlapping-request behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::{Gateway, GatewayError};
use crate::models::{Document, DocumentId, FilePayload};

#[derive(Default)]
struct Script {
    list: VecDeque<Result<Vec<Document>, GatewayError>>,
    upload: VecDeque<Result<Document, GatewayError>>,
    delete: VecDeque<Result<(), GatewayError>>,
    summarize: VecDeque<Result<String, GatewayError>>,
    ask: VecDeque<Result<String, GatewayError>>,
    sections: VecDeque<Result<String, GatewayError>>,
}

#[derive(Default)]
struct Counters {
    list: usize,
    upload: usize,
    delete: usize,
    summarize: usize,
    ask: usize,
    sections: usize,
}

/// Test double for [`Gateway`]. Clones share the same script and counters.
#[derive(Clone, Default)]
pub struct MockGateway {
    script: Arc<Mutex<Script>>,
    counters: Arc<Mutex<Counters>>,
    hold_next_ask: Arc<AtomicBool>,
    ask_gate: Arc<Notify>,
    hold_next_upload: Arc<AtomicBool>,
    upload_gate: Arc<Notify>,
    hold_next_list: Arc<AtomicBool>,
    list_gate: Arc<Notify>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn exhausted(op: &str) -> GatewayError {
        GatewayError::Http {
            status: 500,
            detail: Some(format!("mock script exhausted for {op}")),
        }
    }

    // ── Scripting ───────────────────────────────────────────

    pub fn queue_list(&self, response: Result<Vec<Document>, GatewayError>) {
        self.script.lock().unwrap().list.push_back(response);
    }

    pub fn queue_upload(&self, response: Result<Document, GatewayError>) {
        self.script.lock().unwrap().upload.push_back(response);
    }

    pub fn queue_delete(&self, response: Result<(), GatewayError>) {
        self.script.lock().unwrap().delete.push_back(response);
    }

    pub fn queue_summarize(&self, response: Result<String, GatewayError>) {
        self.script.lock().unwrap().summarize.push_back(response);
    }

    pub fn queue_ask(&self, response: Result<String, GatewayError>) {
        self.script.lock().unwrap().ask.push_back(response);
    }

    pub fn queue_sections(&self, response: Result<String, GatewayError>) {
        self.script.lock().unwrap().sections.push_back(response);
    }

    /// Park the next `ask` call until [`release_ask`](Self::release_ask).
    pub fn hold_next_ask(&self) {
        self.hold_next_ask.store(true, Ordering::SeqCst);
    }

    pub fn release_ask(&self) {
        self.ask_gate.notify_one();
    }

    /// Park the next `upload_document` call until [`release_upload`](Self::release_upload).
    pub fn hold_next_upload(&self) {
        self.hold_next_upload.store(true, Ordering::SeqCst);
    }

    pub fn release_upload(&self) {
        self.upload_gate.notify_one();
    }

    /// Park the next `list_documents` call until [`release_list`](Self::release_list).
    pub fn hold_next_list(&self) {
        self.hold_next_list.store(true, Ordering::SeqCst);
    }

    pub fn release_list(&self) {
        self.list_gate.notify_one();
    }

    // ── Observability ───────────────────────────────────────

    pub fn list_calls(&self) -> usize {
        self.counters.lock().unwrap().list
    }

    pub fn upload_calls(&self) -> usize {
        self.counters.lock().unwrap().upload
    }

    pub fn delete_calls(&self) -> usize {
        self.counters.lock().unwrap().delete
    }

    pub fn summarize_calls(&self) -> usize {
        self.counters.lock().unwrap().summarize
    }

    pub fn ask_calls(&self) -> usize {
        self.counters.lock().unwrap().ask
    }

    pub fn sections_calls(&self) -> usize {
        self.counters.lock().unwrap().sections
    }

    /// Total round-trips across every operation.
    pub fn total_calls(&self) -> usize {
        let c = self.counters.lock().unwrap();
        c.list + c.upload + c.delete + c.summarize + c.ask + c.sections
    }
}

impl Gateway for MockGateway {
    async fn list_documents(&self, _user_id: &str) -> Result<Vec<Document>, GatewayError> {
        self.counters.lock().unwrap().list += 1;
        if self.hold_next_list.swap(false, Ordering::SeqCst) {
            self.list_gate.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .list
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("list_documents")))
    }

    async fn upload_document(
        &self,
        _file: &FilePayload,
        _user_id: &str,
    ) -> Result<Document, GatewayError> {
        self.counters.lock().unwrap().upload += 1;
        if self.hold_next_upload.swap(false, Ordering::SeqCst) {
            self.upload_gate.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .upload
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("upload_document")))
    }

    async fn delete_document(&self, _document_id: &DocumentId) -> Result<(), GatewayError> {
        self.counters.lock().unwrap().delete += 1;
        self.script
            .lock()
            .unwrap()
            .delete
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("delete_document")))
    }

    async fn summarize(&self, _document_id: &DocumentId) -> Result<String, GatewayError> {
        self.counters.lock().unwrap().summarize += 1;
        self.script
            .lock()
            .unwrap()
            .summarize
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("summarize")))
    }

    async fn ask(
        &self,
        _question: &str,
        _document_id: &DocumentId,
    ) -> Result<String, GatewayError> {
        self.counters.lock().unwrap().ask += 1;
        if self.hold_next_ask.swap(false, Ordering::SeqCst) {
            self.ask_gate.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .ask
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("ask")))
    }

    async fn sections(&self, _document_id: &DocumentId) -> Result<String, GatewayError> {
        self.counters.lock().unwrap().sections += 1;
        self.script
            .lock()
            .unwrap()
            .sections
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("sections")))
    }
}

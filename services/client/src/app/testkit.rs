//! services/client/src/app/testkit.rs
//!
//! Hand-rolled port implementations shared by the app-layer tests: an
//! in-memory preference store and a scriptable backend stub.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use campus_assistant_core::domain::{AuthGrant, Document};
use campus_assistant_core::ports::{
    BackendService, PortError, PortResult, PreferenceStore, StoreObserver, KEY_AUTH_TOKEN,
};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

//=========================================================================================
// In-memory PreferenceStore
//=========================================================================================

#[derive(Default)]
pub(crate) struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub(crate) fn with_token(token: &str) -> Self {
        let store = Self::default();
        store.set(KEY_AUTH_TOKEN, token).unwrap();
        store
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.map.lock().unwrap().remove(key);
        Ok(())
    }

    fn subscribe(&self, _observer: StoreObserver) {}
}

//=========================================================================================
// Scriptable BackendService stub
//=========================================================================================

/// A backend whose responses are configured per test. Unconfigured
/// operations fail with a transport error, matching a dead backend.
pub(crate) struct StubBackend {
    pub identity: Option<Value>,
    pub login_token: Option<String>,
    pub logout_ok: bool,
    pub documents: Vec<Document>,
    pub upload_ok: bool,
    pub delete_ok: bool,
    pub answer_payload: Option<Value>,
    pub quiz_payload: Option<Value>,
    /// When set, `answer`/`summarize` block until a permit is released,
    /// letting tests resolve in-flight requests in a chosen order.
    pub answer_gate: Option<Arc<Semaphore>>,
    /// When true, `answer` echoes the question so tests can tell
    /// responses apart.
    pub echo_question: bool,
    pub who_am_i_calls: Arc<AtomicUsize>,
    pub logout_calls: Arc<AtomicUsize>,
    pub upload_calls: Arc<AtomicUsize>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            identity: None,
            login_token: None,
            logout_ok: true,
            documents: Vec::new(),
            upload_ok: true,
            delete_ok: true,
            answer_payload: None,
            quiz_payload: None,
            answer_gate: None,
            echo_question: false,
            who_am_i_calls: Arc::new(AtomicUsize::new(0)),
            logout_calls: Arc::new(AtomicUsize::new(0)),
            upload_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl StubBackend {
    pub(crate) fn with_identity(mut self, identity: Value) -> Self {
        self.identity = Some(identity);
        self
    }

    pub(crate) fn with_login_token(mut self, token: &str) -> Self {
        self.login_token = Some(token.to_string());
        self
    }

    pub(crate) fn with_failing_logout(mut self) -> Self {
        self.logout_ok = false;
        self
    }

    pub(crate) fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = documents;
        self
    }

    pub(crate) fn with_answer(mut self, payload: Value) -> Self {
        self.answer_payload = Some(payload);
        self
    }

    pub(crate) fn with_answer_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.answer_gate = Some(gate);
        self
    }

    pub(crate) fn echoing_questions(mut self) -> Self {
        self.echo_question = true;
        self
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.answer_gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    fn transport() -> PortError {
        PortError::Transport("stubbed transport failure".to_string())
    }
}

pub(crate) fn document(id: &str, title: &str) -> Document {
    Document {
        id: id.to_string(),
        title: Some(title.to_string()),
        filename: None,
        page_count: None,
        chunk_count: None,
    }
}

#[async_trait]
impl BackendService for StubBackend {
    async fn who_am_i(&self) -> PortResult<Value> {
        self.who_am_i_calls.fetch_add(1, Ordering::SeqCst);
        self.identity.clone().ok_or_else(Self::transport)
    }

    async fn login(&self, _email: &str, _password: &str) -> PortResult<AuthGrant> {
        match &self.login_token {
            Some(token) => Ok(AuthGrant { token: token.clone(), user: None }),
            None => Err(PortError::Malformed("auth response had no token".to_string())),
        }
    }

    async fn register(&self, _name: &str, email: &str, password: &str) -> PortResult<AuthGrant> {
        self.login(email, password).await
    }

    async fn logout(&self) -> PortResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_ok {
            Ok(())
        } else {
            Err(Self::transport())
        }
    }

    async fn list_documents(&self) -> PortResult<Vec<Document>> {
        Ok(self.documents.clone())
    }

    async fn upload_document(
        &self,
        _filename: &str,
        _bytes: Vec<u8>,
        _title: Option<&str>,
    ) -> PortResult<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.upload_ok {
            Ok(())
        } else {
            Err(Self::transport())
        }
    }

    async fn delete_document(&self, _document_id: &str) -> PortResult<()> {
        if self.delete_ok {
            Ok(())
        } else {
            Err(Self::transport())
        }
    }

    async fn answer(&self, question: &str, _top_k: u32, _length: &str) -> PortResult<Value> {
        self.wait_for_gate().await;
        if self.echo_question {
            return Ok(json!({ "answer": format!("echo: {question}") }));
        }
        self.answer_payload.clone().ok_or_else(Self::transport)
    }

    async fn summarize(&self, question: &str, top_k: u32, length: &str) -> PortResult<Value> {
        self.answer(question, top_k, length).await
    }

    async fn generate_quiz(
        &self,
        _question: &str,
        _q_type: &str,
        _count: u32,
        _top_k: u32,
    ) -> PortResult<Value> {
        self.quiz_payload.clone().ok_or_else(Self::transport)
    }
}

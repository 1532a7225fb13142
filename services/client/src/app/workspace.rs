//! services/client/src/app/workspace.rs
//!
//! Document workspace state: whether any document has ever existed, which
//! document is selected, and the reload token dependent list views watch
//! to know their cache is stale.

use std::sync::Arc;

use campus_assistant_core::domain::Document;
use campus_assistant_core::ports::{
    BackendService, PortResult, PreferenceStore, KEY_HAS_DOCUMENTS,
};
use tracing::warn;

/// Client-side view of the document workspace.
pub struct WorkspaceState {
    backend: Arc<dyn BackendService>,
    store: Arc<dyn PreferenceStore>,
    /// Sticky: once any upload succeeds or any existing document is
    /// observed, this stays true for the lifetime of the profile, even
    /// after every document is deleted.
    has_documents: bool,
    reload_token: u64,
    selected: Option<String>,
    documents: Vec<Document>,
}

impl WorkspaceState {
    /// Creates the workspace, seeding the sticky flag from the store.
    pub fn new(backend: Arc<dyn BackendService>, store: Arc<dyn PreferenceStore>) -> Self {
        let has_documents = store
            .get(KEY_HAS_DOCUMENTS)
            .ok()
            .flatten()
            .map(|flag| flag == "true")
            .unwrap_or(false);

        Self {
            backend,
            store,
            has_documents,
            reload_token: 0,
            selected: None,
            documents: Vec::new(),
        }
    }

    pub fn has_documents(&self) -> bool {
        self.has_documents
    }

    /// Incremented on every successful upload; a changed value tells the
    /// document list its cache is invalid.
    pub fn reload_token(&self) -> u64 {
        self.reload_token
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected document, looked up by id in the local list. Returns
    /// `None` while the selection points at a document that is no longer
    /// listed; the selection itself is kept until the user acts.
    pub fn selected_document(&self) -> Option<&Document> {
        let id = self.selected.as_deref()?;
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn select_document(&mut self, id: &str) {
        self.selected = Some(id.to_string());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Refetches the document list. Observing any existing document also
    /// sets the sticky flag.
    pub async fn refresh(&mut self) -> PortResult<()> {
        let documents = self.backend.list_documents().await?;
        if !documents.is_empty() {
            self.mark_has_documents();
        }
        self.documents = documents;
        Ok(())
    }

    /// Uploads one document. On success the sticky flag is set and the
    /// reload token advances by exactly one.
    pub async fn upload(
        &mut self,
        filename: &str,
        bytes: Vec<u8>,
        title: Option<&str>,
    ) -> PortResult<()> {
        self.backend.upload_document(filename, bytes, title).await?;
        self.mark_has_documents();
        self.reload_token += 1;
        Ok(())
    }

    /// Deletes a document. The local list is filtered regardless of the
    /// server outcome; the error, if any, is returned for surfacing.
    /// Deleting the selected document clears the selection.
    pub async fn delete(&mut self, document_id: &str) -> PortResult<()> {
        let result = self.backend.delete_document(document_id).await;
        if let Err(e) = &result {
            warn!("Backend delete of {document_id} failed ({e}); removing locally anyway.");
        }

        self.documents.retain(|d| d.id != document_id);
        if self.selected.as_deref() == Some(document_id) {
            self.selected = None;
        }
        result
    }

    fn mark_has_documents(&mut self) {
        if self.has_documents {
            return;
        }
        self.has_documents = true;
        if let Err(e) = self.store.set(KEY_HAS_DOCUMENTS, "true") {
            warn!("Failed to persist the has-documents flag: {e}");
        }
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testkit::{document, MemoryStore, StubBackend};

    fn workspace(backend: StubBackend, store: Arc<MemoryStore>) -> WorkspaceState {
        WorkspaceState::new(Arc::new(backend), store)
    }

    #[tokio::test]
    async fn each_successful_upload_advances_the_reload_token_by_one() {
        let store = Arc::new(MemoryStore::default());
        let mut ws = workspace(StubBackend::default(), store.clone());
        assert!(!ws.has_documents());
        assert_eq!(ws.reload_token(), 0);

        ws.upload("notes.pdf", vec![1, 2, 3], None).await.unwrap();
        assert!(ws.has_documents());
        assert_eq!(ws.reload_token(), 1);

        ws.upload("more.pdf", vec![4], Some("More notes")).await.unwrap();
        assert_eq!(ws.reload_token(), 2);
        assert_eq!(store.get(KEY_HAS_DOCUMENTS).unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn a_failed_upload_changes_nothing() {
        let backend = StubBackend { upload_ok: false, ..Default::default() };
        let mut ws = workspace(backend, Arc::new(MemoryStore::default()));

        assert!(ws.upload("notes.pdf", vec![1], None).await.is_err());
        assert!(!ws.has_documents());
        assert_eq!(ws.reload_token(), 0);
    }

    #[tokio::test]
    async fn the_sticky_flag_never_reverts_once_documents_were_observed() {
        let backend = StubBackend::default().with_documents(vec![document("d1", "Doc 1")]);
        let store = Arc::new(MemoryStore::default());
        let mut ws = workspace(backend, store.clone());

        ws.refresh().await.unwrap();
        assert!(ws.has_documents());

        // The backend now reports no documents at all; the flag stays.
        ws.backend = Arc::new(StubBackend::default());
        ws.refresh().await.unwrap();
        assert!(ws.documents().is_empty());
        assert!(ws.has_documents());
    }

    #[tokio::test]
    async fn the_sticky_flag_is_seeded_from_the_store() {
        let store = Arc::new(MemoryStore::default());
        store.set(KEY_HAS_DOCUMENTS, "true").unwrap();
        let ws = workspace(StubBackend::default(), store);
        assert!(ws.has_documents());
    }

    #[tokio::test]
    async fn delete_filters_locally_even_when_the_server_call_fails() {
        let backend = StubBackend {
            delete_ok: false,
            ..Default::default()
        }
        .with_documents(vec![document("d1", "Doc 1"), document("d2", "Doc 2")]);
        let mut ws = workspace(backend, Arc::new(MemoryStore::default()));
        ws.refresh().await.unwrap();
        ws.select_document("d1");

        assert!(ws.delete("d1").await.is_err());
        assert_eq!(ws.documents().len(), 1);
        assert_eq!(ws.documents()[0].id, "d2");
        assert_eq!(ws.selected_id(), None);
    }

    #[tokio::test]
    async fn deleting_an_unselected_document_keeps_the_selection() {
        let backend = StubBackend::default()
            .with_documents(vec![document("d1", "Doc 1"), document("d2", "Doc 2")]);
        let mut ws = workspace(backend, Arc::new(MemoryStore::default()));
        ws.refresh().await.unwrap();
        ws.select_document("d2");

        ws.delete("d1").await.unwrap();
        assert_eq!(ws.selected_id(), Some("d2"));
        assert_eq!(ws.selected_document().unwrap().title.as_deref(), Some("Doc 2"));
    }

    #[tokio::test]
    async fn a_selection_can_dangle_until_the_user_acts() {
        let backend = StubBackend::default().with_documents(vec![document("d1", "Doc 1")]);
        let mut ws = workspace(backend, Arc::new(MemoryStore::default()));
        ws.refresh().await.unwrap();
        ws.select_document("d1");

        // The document disappears server-side; a refresh empties the list
        // but the selection id is kept, resolving to nothing.
        ws.backend = Arc::new(StubBackend::default());
        ws.refresh().await.unwrap();
        assert_eq!(ws.selected_id(), Some("d1"));
        assert!(ws.selected_document().is_none());

        ws.clear_selection();
        assert_eq!(ws.selected_id(), None);
    }
}

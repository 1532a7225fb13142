//! crates/campus_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the HTTP backend
//! or the persisted preference file.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{AuthGrant, Document};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// `Transport` and `Malformed` mirror the two ways a backend exchange can
/// go wrong: the request never produced a usable response, or the response
/// body had an unusable shape. Neither is ever retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The Remote API Client boundary.
///
/// The persisted credential is implicit: implementations read it themselves
/// and attach it to every request that needs one. Answer, summary, and quiz
/// payloads are returned as raw JSON because their shape varies; the core
/// normalizes them, the adapter never does.
#[async_trait]
pub trait BackendService: Send + Sync {
    // --- Auth ---
    async fn who_am_i(&self) -> PortResult<Value>;

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant>;

    async fn register(&self, name: &str, email: &str, password: &str) -> PortResult<AuthGrant>;

    async fn logout(&self) -> PortResult<()>;

    // --- Documents ---
    async fn list_documents(&self) -> PortResult<Vec<Document>>;

    async fn upload_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        title: Option<&str>,
    ) -> PortResult<()>;

    async fn delete_document(&self, document_id: &str) -> PortResult<()>;

    // --- Question answering ---
    async fn answer(&self, question: &str, top_k: u32, length: &str) -> PortResult<Value>;

    async fn summarize(&self, question: &str, top_k: u32, length: &str) -> PortResult<Value>;

    async fn generate_quiz(
        &self,
        question: &str,
        q_type: &str,
        count: u32,
        top_k: u32,
    ) -> PortResult<Value>;
}

/// An observer invoked with the key of a preference that changed outside
/// this execution context.
pub type StoreObserver = Box<dyn Fn(&str) + Send + Sync>;

/// A persisted key/value store for the handful of local flags the client
/// keeps between runs: the auth credential, the dark-mode flag, and the
/// has-any-documents flag.
///
/// Cross-context change notification is an explicit observer callback:
/// a sibling context clearing the credential key must reach subscribers
/// so the session gate can revalidate.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;

    /// Registers an observer for externally-originated key changes.
    fn subscribe(&self, observer: StoreObserver);
}

/// Store key holding the backend credential.
pub const KEY_AUTH_TOKEN: &str = "auth_token";
/// Store key holding the dark-mode preference.
pub const KEY_DARK_MODE: &str = "dark_mode";
/// Store key holding the sticky has-any-documents flag.
pub const KEY_HAS_DOCUMENTS: &str = "has_documents";

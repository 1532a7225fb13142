//! crates/campus_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or storage format.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// The authentication state owned by the session gate.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Unauthenticated,
    Validating,
    Authenticated(UserRecord),
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated(_))
    }
}

/// The identity returned by the backend's who-am-I endpoint.
///
/// Constructed only through [`UserRecord::from_identity`], which rejects
/// null identities and objects with zero observable fields. This keeps the
/// invariant that an `Authenticated` session always holds a non-empty record.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserRecord {
    /// Builds a record from a raw identity payload.
    ///
    /// Returns `None` when the identity is `null`, not an object, or an
    /// object with no keys at all. Unknown extra fields are ignored but
    /// still count as observable.
    pub fn from_identity(identity: &Value) -> Option<Self> {
        let obj = identity.as_object()?;
        if obj.is_empty() {
            return None;
        }
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id: text("_id").or_else(|| text("id")),
            name: text("name"),
            email: text("email"),
        })
    }
}

/// A successful login or register response.
///
/// A payload without a token never becomes a grant; the adapter surfaces
/// it as a malformed-payload error instead.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub token: String,
    pub user: Option<UserRecord>,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A single entry in the append-only chat log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub quotes: Vec<Quote>,
    pub sources: Vec<Source>,
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A plain user message with no citation fields.
    pub fn from_user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            quotes: Vec::new(),
            sources: Vec::new(),
            suggestions: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// A verbatim snippet cited by an assistant answer, keyed by a 1-based
/// source index.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub source_index: i64,
    pub text: String,
}

/// A retrieved document reference attached to an assistant answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub source_index: i64,
    pub title: Option<String>,
    pub page: Option<i64>,
}

/// An uploaded document as reported by the backend listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: Option<String>,
    pub filename: Option<String>,
    pub page_count: Option<i64>,
    pub chunk_count: Option<i64>,
}

/// One generated quiz question.
///
/// `correct_option` is positionally derived (`A` = option 0) and never
/// taken verbatim from backend text; a letter that maps outside the option
/// list is dropped during parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: Option<char>,
    pub explanation: Option<String>,
}

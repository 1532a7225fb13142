//! services/client/src/app/events.rs
//!
//! Defines the in-process messages spawned workspace tasks send back to
//! the terminal event loop. These provide context for what the loop
//! should render next.

use campus_assistant_core::domain::ChatMessage;

/// Notifications emitted by a chat session's background tasks.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// An assistant response was normalized and committed to the log.
    Answered(ChatMessage),

    /// An answer or summary request failed. Surfaced once; the operation
    /// must be re-initiated manually.
    Failed { message: String },
}

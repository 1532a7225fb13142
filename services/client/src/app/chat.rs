//! services/client/src/app/chat.rs
//!
//! The chat view state: an append-only message log fed by spawned
//! answer/summary exchanges. The initiating interaction is the only thing
//! suspended while a request is in flight; several exchanges may overlap.
//! Each one carries a request id and the session's cancellation token, so
//! a resolution is committed only when it is still the most recent
//! request and the session has not been torn down.

use std::sync::Arc;

use campus_assistant_core::domain::ChatMessage;
use campus_assistant_core::normalize::normalize_answer;
use campus_assistant_core::ports::BackendService;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::events::ChatEvent;
use crate::app::tasks::RequestTracker;

/// One chat session against the currently loaded documents.
pub struct ChatSession {
    backend: Arc<dyn BackendService>,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    tracker: Arc<RequestTracker>,
    lifetime: CancellationToken,
    events: UnboundedSender<ChatEvent>,
    answer_top_k: u32,
    summary_top_k: u32,
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn BackendService>,
        events: UnboundedSender<ChatEvent>,
        answer_top_k: u32,
        summary_top_k: u32,
    ) -> Self {
        Self {
            backend,
            messages: Arc::new(Mutex::new(Vec::new())),
            tracker: Arc::new(RequestTracker::new()),
            lifetime: CancellationToken::new(),
            events,
            answer_top_k,
            summary_top_k,
        }
    }

    /// A snapshot of the message log in append order.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().await.clone()
    }

    /// Appends the user's message and spawns the answer exchange.
    pub async fn ask(&self, question: &str, length: &str) -> JoinHandle<()> {
        self.messages
            .lock()
            .await
            .push(ChatMessage::from_user(question));

        let backend = self.backend.clone();
        let question = question.to_string();
        let length = length.to_string();
        let top_k = self.answer_top_k;
        self.spawn_exchange(async move { backend.answer(&question, top_k, &length).await })
    }

    /// Spawns a summary exchange over the retrieval for `topic`.
    /// The summary arrives as a normal assistant message.
    pub fn summarize(&self, topic: &str, length: &str) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let topic = topic.to_string();
        let length = length.to_string();
        let top_k = self.summary_top_k;
        self.spawn_exchange(async move { backend.summarize(&topic, top_k, &length).await })
    }

    /// Revokes the session's task lifetime. Any exchange still in flight
    /// resolves into nothing: no log append, no event.
    pub fn close(&self) {
        self.lifetime.cancel();
    }

    fn spawn_exchange(
        &self,
        request: impl std::future::Future<Output = campus_assistant_core::ports::PortResult<serde_json::Value>>
            + Send
            + 'static,
    ) -> JoinHandle<()> {
        let request_id = self.tracker.begin();
        let tracker = self.tracker.clone();
        let lifetime = self.lifetime.clone();
        let messages = self.messages.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = lifetime.cancelled() => return,
                outcome = request => outcome,
            };

            if !tracker.is_current(request_id) {
                info!("Discarding stale resolution for request {request_id}.");
                return;
            }

            match outcome {
                Ok(payload) => {
                    let normalized = normalize_answer(&payload);
                    if normalized.is_degraded() {
                        warn!("Answer payload degraded to defaults.");
                    }
                    let message = normalized.into_message();
                    messages.lock().await.push(message.clone());
                    let _ = events.send(ChatEvent::Answered(message));
                }
                Err(e) => {
                    let _ = events.send(ChatEvent::Failed { message: e.to_string() });
                }
            }
        })
    }
}

//=========================================================================================
// Tests
//=========================================================================================

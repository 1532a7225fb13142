pub mod chat;
pub mod events;
pub mod gate;
pub mod tasks;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testkit;

// Re-export the stateful components to make them easily accessible
// to the binary that wires the terminal loop.
pub use chat::ChatSession;
pub use events::ChatEvent;
pub use gate::SessionGate;
pub use tasks::RequestTracker;
pub use workspace::WorkspaceState;

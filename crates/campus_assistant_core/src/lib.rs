pub mod domain;
pub mod normalize;
pub mod ports;
pub mod quiz;

pub use domain::{
    AuthGrant, ChatMessage, Document, Quote, QuizQuestion, Role, SessionStatus, Source, UserRecord,
};
pub use normalize::{normalize_answer, NormalizedAnswer, NO_ANSWER_FALLBACK};
pub use ports::{BackendService, PortError, PortResult, PreferenceStore, StoreObserver};
pub use quiz::{letter_for, parse_quiz_payload, OptionMark, QuizAttempt, QuizGrader};

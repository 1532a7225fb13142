//! crates/campus_assistant_core/src/normalize.rs
//!
//! Converts a loosely-shaped backend answer payload into a canonical
//! [`ChatMessage`]. The backend assembles its responses from an LLM reply
//! and a retrieval pass, so every field can independently be missing,
//! renamed, or of the wrong shape; each one degrades to its default on
//! its own, and the function as a whole never fails.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{ChatMessage, Quote, Role, Source};

/// Shown when neither a structured answer nor raw model text was returned.
pub const NO_ANSWER_FALLBACK: &str = "No answer was returned for this question.";

/// The tagged result of the parse step.
///
/// Consumers always receive a complete [`ChatMessage`]; the tag records
/// whether the backend provided a structured answer or the content had to
/// fall back to raw model text or the literal fallback string.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedAnswer {
    Structured(ChatMessage),
    Degraded(ChatMessage),
}

impl NormalizedAnswer {
    pub fn message(&self) -> &ChatMessage {
        match self {
            NormalizedAnswer::Structured(m) | NormalizedAnswer::Degraded(m) => m,
        }
    }

    pub fn into_message(self) -> ChatMessage {
        match self {
            NormalizedAnswer::Structured(m) | NormalizedAnswer::Degraded(m) => m,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, NormalizedAnswer::Degraded(_))
    }
}

/// Normalizes one answer or summary payload.
///
/// Content is the first non-empty of `answer`, `summary`, `raw`, else the
/// literal fallback. Quotes, sources, and suggestions are each optional
/// and independently defaulted.
pub fn normalize_answer(payload: &Value) -> NormalizedAnswer {
    let structured = non_empty_text(payload.get("answer"))
        .or_else(|| non_empty_text(payload.get("summary")));

    let content = structured
        .clone()
        .or_else(|| non_empty_text(payload.get("raw")))
        .unwrap_or_else(|| NO_ANSWER_FALLBACK.to_string());

    let message = ChatMessage {
        id: Uuid::new_v4(),
        role: Role::Assistant,
        content,
        quotes: normalize_quotes(payload),
        sources: normalize_sources(payload),
        suggestions: normalize_suggestions(payload),
        timestamp: Utc::now(),
    };

    if structured.is_some() {
        NormalizedAnswer::Structured(message)
    } else {
        NormalizedAnswer::Degraded(message)
    }
}

//=========================================================================================
// Field-wise normalization helpers
//=========================================================================================

fn normalize_quotes(payload: &Value) -> Vec<Quote> {
    let raw = payload.get("quotes").or_else(|| payload.get("quoted"));
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                // An object item missing `text` keeps an empty quote body,
                // matching the backend's own assembly of these payloads.
                Value::Object(obj) => Quote {
                    source_index: numeric(obj.get("source"))
                        .or_else(|| numeric(obj.get("source_number")))
                        .unwrap_or(0),
                    text: value_to_text(obj.get("text")),
                },
                // A plain string (or any scalar) gets its 1-based position.
                other => Quote {
                    source_index: (i + 1) as i64,
                    text: value_to_text(Some(other)),
                },
            })
            .collect(),
        Some(Value::String(s)) => vec![Quote {
            source_index: 1,
            text: s.clone(),
        }],
        _ => Vec::new(),
    }
}

fn normalize_sources(payload: &Value) -> Vec<Source> {
    if let Some(Value::Array(items)) = payload.get("sources") {
        return items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(obj) => Source {
                    source_index: numeric(obj.get("source_number"))
                        .or_else(|| numeric(obj.get("source")))
                        .unwrap_or((i + 1) as i64),
                    title: obj.get("title").and_then(Value::as_str).map(str::to_string),
                    page: numeric(obj.get("page")),
                },
                other => Source {
                    source_index: (i + 1) as i64,
                    title: Some(value_to_text(Some(other))),
                    page: None,
                },
            })
            .collect();
    }

    // No structured sources: derive 1-based indices from the retrieval list.
    if let Some(Value::Array(items)) = payload.get("retrieved") {
        return items
            .iter()
            .enumerate()
            .map(|(i, item)| Source {
                source_index: (i + 1) as i64,
                title: item.get("title").and_then(Value::as_str).map(str::to_string),
                page: numeric(item.get("page")),
            })
            .collect();
    }

    Vec::new()
}

fn normalize_suggestions(payload: &Value) -> Vec<String> {
    for key in ["study_suggestions", "suggestions"] {
        if let Some(Value::Array(items)) = payload.get(key) {
            return items.iter().map(|s| value_to_text(Some(s))).collect();
        }
    }
    Vec::new()
}

/// Coerces a JSON value to display text. Strings pass through, other
/// scalars are rendered, null and absent become empty.
fn value_to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Lenient numeric coercion: numbers pass through, numeric strings parse,
/// everything else is absent.
fn numeric(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_answer_yields_structured_message_with_empty_defaults() {
        let normalized = normalize_answer(&json!({ "answer": "42" }));
        assert!(!normalized.is_degraded());
        let message = normalized.into_message();
        assert_eq!(message.content, "42");
        assert_eq!(message.role, Role::Assistant);
        assert!(message.quotes.is_empty());
        assert!(message.sources.is_empty());
        assert!(message.suggestions.is_empty());
    }

    #[test]
    fn string_quotes_get_positional_indices_and_sources_get_fallback_index() {
        let normalized = normalize_answer(&json!({
            "quotes": ["hello"],
            "sources": [{ "title": "Doc A" }],
        }));
        let message = normalized.message();
        assert_eq!(
            message.quotes,
            vec![Quote { source_index: 1, text: "hello".to_string() }]
        );
        assert_eq!(message.sources.len(), 1);
        assert_eq!(message.sources[0].source_index, 1);
        assert_eq!(message.sources[0].title.as_deref(), Some("Doc A"));
        assert_eq!(message.sources[0].page, None);
    }

    #[test]
    fn empty_payload_degrades_to_the_fallback_content() {
        let normalized = normalize_answer(&json!({}));
        assert!(normalized.is_degraded());
        assert_eq!(normalized.message().content, NO_ANSWER_FALLBACK);
    }

    #[test]
    fn raw_text_is_used_when_no_structured_answer_is_present() {
        let normalized = normalize_answer(&json!({ "answer": "", "raw": "model text" }));
        assert!(normalized.is_degraded());
        assert_eq!(normalized.message().content, "model text");
    }

    #[test]
    fn summary_payloads_are_structured() {
        let normalized = normalize_answer(&json!({ "summary": "short version" }));
        assert!(!normalized.is_degraded());
        assert_eq!(normalized.message().content, "short version");
    }

    #[test]
    fn object_quotes_read_source_aliases_and_stringify_text() {
        let normalized = normalize_answer(&json!({
            "answer": "a",
            "quoted": [
                { "source": 3, "text": "first" },
                { "source_number": "2", "text": 7 },
                { "no_fields": true },
            ],
        }));
        let quotes = &normalized.message().quotes;
        assert_eq!(quotes[0], Quote { source_index: 3, text: "first".to_string() });
        assert_eq!(quotes[1], Quote { source_index: 2, text: "7".to_string() });
        assert_eq!(quotes[2], Quote { source_index: 0, text: String::new() });
    }

    #[test]
    fn single_string_quote_becomes_one_quote_with_index_one() {
        let normalized = normalize_answer(&json!({ "answer": "a", "quotes": "lone quote" }));
        assert_eq!(
            normalized.message().quotes,
            vec![Quote { source_index: 1, text: "lone quote".to_string() }]
        );
    }

    #[test]
    fn non_array_non_string_quotes_are_dropped() {
        let normalized = normalize_answer(&json!({ "answer": "a", "quotes": { "oops": 1 } }));
        assert!(normalized.message().quotes.is_empty());
    }

    #[test]
    fn sources_fall_back_to_the_retrieved_list() {
        let normalized = normalize_answer(&json!({
            "answer": "a",
            "retrieved": [
                { "title": "Doc A", "page": 4 },
                { "title": "Doc B" },
            ],
        }));
        let sources = &normalized.message().sources;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source_index, 1);
        assert_eq!(sources[0].page, Some(4));
        assert_eq!(sources[1].source_index, 2);
        assert_eq!(sources[1].title.as_deref(), Some("Doc B"));
    }

    #[test]
    fn first_suggestion_array_wins_and_non_arrays_are_skipped() {
        let normalized = normalize_answer(&json!({
            "answer": "a",
            "study_suggestions": "not an array",
            "suggestions": ["review chapter 2", 3],
        }));
        assert_eq!(
            normalized.message().suggestions,
            vec!["review chapter 2".to_string(), "3".to_string()]
        );
    }
}

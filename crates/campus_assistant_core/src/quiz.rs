//! crates/campus_assistant_core/src/quiz.rs
//!
//! Parsing and lifecycle of one generated quiz instance: answer selection,
//! one-shot submission, scoring, and review-mode marks. A new quiz replaces
//! the previous attempt entirely; attempts are never merged.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::QuizQuestion;
use crate::ports::{PortError, PortResult};

/// Derives the display letter for an option position (`A` = index 0).
/// Positions past `Z` have no letter and cannot be selected.
pub fn letter_for(index: usize) -> Option<char> {
    if index < 26 {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}

fn letter_index(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase();
    upper.is_ascii_uppercase().then(|| (upper as u8 - b'A') as usize)
}

//=========================================================================================
// Payload Parsing
//=========================================================================================

/// Extracts the question list from a generate-quiz response.
///
/// The backend may reply with `{"quiz": [...]}`, a bare array, a JSON
/// string that itself encodes an array, or `{"quiz_raw": ...}` wrapping
/// either. Anything that does not resolve to an array of question objects
/// is a malformed payload; the caller surfaces it and leaves any previous
/// attempt untouched.
pub fn parse_quiz_payload(payload: &Value) -> PortResult<Vec<QuizQuestion>> {
    let array = resolve_question_array(payload)
        .ok_or_else(|| PortError::Malformed("quiz payload did not contain a question list".to_string()))?;

    Ok(array.iter().filter_map(parse_question).collect())
}

fn resolve_question_array(payload: &Value) -> Option<Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items.clone()),
        Value::String(text) => parse_embedded_array(text),
        Value::Object(obj) => {
            if let Some(inner) = obj.get("quiz") {
                return resolve_question_array(inner);
            }
            obj.get("quiz_raw").and_then(resolve_question_array)
        }
        _ => None,
    }
}

/// Parses a JSON array out of raw model text, tolerating a markdown code
/// fence around it.
fn parse_embedded_array(text: &str) -> Option<Vec<Value>> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    match serde_json::from_str::<Value>(unfenced) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn parse_question(item: &Value) -> Option<QuizQuestion> {
    let obj = item.as_object()?;
    let question = obj
        .get("question")
        .or_else(|| obj.get("q"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let options: Vec<String> = match obj.get("options") {
        Some(Value::Array(opts)) => opts
            .iter()
            .map(|o| match o {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };

    let correct_option = obj
        .get("correct_option")
        .or_else(|| obj.get("correctOption"))
        .or_else(|| obj.get("answer"))
        .and_then(Value::as_str)
        .and_then(|raw| derive_correct_letter(raw, &options));

    let explanation = obj
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Some(QuizQuestion {
        question,
        options,
        correct_option,
        explanation,
    })
}

/// Resolves the backend's correct-answer field to a positional letter.
///
/// A single alphabetic character is treated as a letter and kept only if
/// it maps inside the option list; any longer text is matched against the
/// options themselves and the letter derived from the matching position.
fn derive_correct_letter(raw: &str, options: &[String]) -> Option<char> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    if let (Some(single), None) = (chars.next(), chars.next()) {
        if single.is_ascii_alphabetic() {
            let index = letter_index(single)?;
            return (index < options.len()).then(|| single.to_ascii_uppercase());
        }
        return None;
    }

    options
        .iter()
        .position(|option| option.trim().eq_ignore_ascii_case(trimmed))
        .and_then(letter_for)
}

//=========================================================================================
// Attempt and Grader
//=========================================================================================

/// One user's set of answers to a quiz instance.
/// `score` is defined exactly when `submitted` is true.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizAttempt {
    selected: BTreeMap<usize, char>,
    submitted: bool,
    score: Option<usize>,
}

/// How a single option should be rendered.
///
/// Before submission only the in-progress selection is visible; after
/// submission each option is marked correct, selected-but-wrong, or
/// neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    Selected,
    Unselected,
    MatchedCorrect,
    SelectedWrong,
    Neither,
}

/// Owns the lifecycle of one generated quiz.
#[derive(Debug, Clone)]
pub struct QuizGrader {
    questions: Vec<QuizQuestion>,
    attempt: QuizAttempt,
}

impl QuizGrader {
    /// Starts a fresh attempt over the given questions.
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self {
            questions,
            attempt: QuizAttempt::default(),
        }
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn is_submitted(&self) -> bool {
        self.attempt.submitted
    }

    pub fn score(&self) -> Option<usize> {
        self.attempt.score
    }

    pub fn selected(&self, question: usize) -> Option<char> {
        self.attempt.selected.get(&question).copied()
    }

    /// Records the letter for an option, overwriting any prior selection
    /// for the same question. No-op once submitted, and for indices that
    /// do not name a real option.
    pub fn select(&mut self, question: usize, option: usize) {
        if self.attempt.submitted {
            return;
        }
        let Some(entry) = self.questions.get(question) else {
            return;
        };
        if option >= entry.options.len() {
            return;
        }
        if let Some(letter) = letter_for(option) {
            self.attempt.selected.insert(question, letter);
        }
    }

    /// Scores the attempt and freezes all selections.
    ///
    /// Idempotent: a second call changes nothing, including the recorded
    /// score. A quiz with no questions cannot be submitted.
    pub fn submit(&mut self) {
        if self.attempt.submitted || self.questions.is_empty() {
            return;
        }

        let score = self
            .questions
            .iter()
            .enumerate()
            .filter(|(index, question)| {
                match (question.correct_option, self.attempt.selected.get(index)) {
                    (Some(correct), Some(selected)) => {
                        correct.to_ascii_uppercase() == selected.to_ascii_uppercase()
                    }
                    _ => false,
                }
            })
            .count();

        self.attempt.score = Some(score);
        self.attempt.submitted = true;
    }

    /// Questions with no selection yet. Valid before and after submission.
    pub fn unanswered_count(&self) -> usize {
        self.questions.len() - self.attempt.selected.len()
    }

    /// Rendering mark for one option of one question.
    pub fn option_mark(&self, question: usize, option: usize) -> OptionMark {
        let letter = letter_for(option);
        let selected = self.selected(question);

        if !self.attempt.submitted {
            return if letter.is_some() && selected == letter {
                OptionMark::Selected
            } else {
                OptionMark::Unselected
            };
        }

        let correct = self.questions.get(question).and_then(|q| q.correct_option);
        if letter.is_some() && letter == correct {
            OptionMark::MatchedCorrect
        } else if letter.is_some() && selected == letter {
            OptionMark::SelectedWrong
        } else {
            OptionMark::Neither
        }
    }

    /// The per-question explanation, withheld until the attempt is
    /// submitted.
    pub fn explanation(&self, question: usize) -> Option<&str> {
        if !self.attempt.submitted {
            return None;
        }
        self.questions.get(question)?.explanation.as_deref()
    }
}

//=========================================================================================
// Tests
//=========================================================================================

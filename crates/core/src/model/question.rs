use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has empty text")]
    EmptyText { id: QuestionId },

    #[error("question {id} needs at least two options, found {visible}")]
    TooFewOptions { id: QuestionId, visible: usize },

    #[error("question {id} marks option {index} as correct, but it is missing or blank")]
    InvalidCorrectAnswer { id: QuestionId, index: usize },
}

//
// ─── DRAFT ────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in a question bank file.
///
/// Options may be `null` or blank; those slots keep their position so the
/// correct index stays stable, but they are never offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub text: String,
    #[serde(default)]
    pub options: Vec<Option<String>>,
    pub correct_answer_index: usize,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft into a [`Question`].
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, fewer than two options are
    /// visible, or the correct index does not point at a visible option.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id;
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText { id });
        }

        let options: Vec<String> = self
            .options
            .into_iter()
            .map(|opt| opt.unwrap_or_default())
            .collect();

        let visible = options.iter().filter(|opt| !opt.trim().is_empty()).count();
        if visible < 2 {
            return Err(QuestionError::TooFewOptions { id, visible });
        }

        let index = self.correct_answer_index;
        if options.get(index).is_none_or(|opt| opt.trim().is_empty()) {
            return Err(QuestionError::InvalidCorrectAnswer { id, index });
        }

        Ok(Question {
            id,
            text,
            options,
            correct_answer_index: index,
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
            image: self.image.filter(|i| !i.trim().is_empty()),
        })
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A multiple-choice question. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer_index: usize,
    explanation: Option<String>,
    image: Option<String>,
}

impl Question {
    /// Build a question from text and options.
    ///
    /// # Errors
    ///
    /// See [`QuestionDraft::validate`].
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer_index: usize,
    ) -> Result<Self, QuestionError> {
        QuestionDraft {
            id,
            text: text.into(),
            options: options.into_iter().map(Some).collect(),
            correct_answer_index,
            explanation: None,
            image: None,
        }
        .validate()
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All option slots, including blank ones.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Options that should be rendered, paired with their original index.
    pub fn visible_options(&self) -> impl Iterator<Item = (usize, &str)> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, opt)| !opt.trim().is_empty())
            .map(|(idx, opt)| (idx, opt.as_str()))
    }

    /// True if `index` refers to a selectable (non-blank) option.
    #[must_use]
    pub fn is_selectable(&self, index: usize) -> bool {
        self.options
            .get(index)
            .is_some_and(|opt| !opt.trim().is_empty())
    }

    #[must_use]
    pub fn correct_answer_index(&self) -> usize {
        self.correct_answer_index
    }

    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        self.correct_answer_index == index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn blank_options_are_skipped_but_keep_their_index() {
        let q = Question::new(QuestionId::new(1), "قلم : كتابة", opts(&["مقص : قص", "", "باب : بيت"]), 2)
            .unwrap();
        let visible: Vec<_> = q.visible_options().collect();
        assert_eq!(visible, vec![(0, "مقص : قص"), (2, "باب : بيت")]);
        assert!(!q.is_selectable(1));
        assert!(q.is_selectable(2));
        assert!(!q.is_selectable(7));
    }

    #[test]
    fn correct_index_must_point_at_visible_option() {
        let err = Question::new(QuestionId::new(2), "Q", opts(&["a", "", "c"]), 1).unwrap_err();
        assert_eq!(
            err,
            QuestionError::InvalidCorrectAnswer {
                id: QuestionId::new(2),
                index: 1
            }
        );
    }

    #[test]
    fn needs_two_visible_options() {
        let err = Question::new(QuestionId::new(3), "Q", opts(&["a", "  "]), 0).unwrap_err();
        assert!(matches!(err, QuestionError::TooFewOptions { visible: 1, .. }));
    }

    #[test]
    fn draft_accepts_null_options_from_json() {
        let json = r#"{
            "id": 9,
            "text": "  Which?  ",
            "options": ["one", null, "three"],
            "correctAnswerIndex": 0,
            "explanation": ""
        }"#;
        let draft: QuestionDraft = serde_json::from_str(json).unwrap();
        let q = draft.validate().unwrap();
        assert_eq!(q.text(), "Which?");
        assert_eq!(q.options().len(), 3);
        assert_eq!(q.explanation(), None);
    }
}

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::model::ids::QuizId;
use crate::model::question::{Question, QuestionDraft, QuestionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("quiz {0} appears more than once")]
    DuplicateQuiz(QuizId),

    #[error("quiz {0} has no questions")]
    EmptyQuiz(QuizId),

    #[error("quiz {quiz}: {source}")]
    InvalidQuestion {
        quiz: QuizId,
        #[source]
        source: QuestionError,
    },
}

/// One quiz of the bank: a title and its ordered questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDefinition {
    id: QuizId,
    title: String,
    questions: Vec<Question>,
}

impl QuizDefinition {
    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

#[derive(Deserialize)]
struct RawBank {
    quizzes: Vec<RawQuiz>,
}

#[derive(Deserialize)]
struct RawQuiz {
    id: QuizId,
    title: String,
    questions: Vec<QuestionDraft>,
}

/// Read-only collection of quizzes keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    quizzes: BTreeMap<QuizId, QuizDefinition>,
}

impl QuestionBank {
    /// Parse and validate a bank from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `BankError` for malformed JSON, duplicate or empty quizzes, and
    /// questions that fail validation.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let raw: RawBank = serde_json::from_str(json)?;
        let mut quizzes = BTreeMap::new();

        for quiz in raw.quizzes {
            if quiz.questions.is_empty() {
                return Err(BankError::EmptyQuiz(quiz.id));
            }
            let questions = quiz
                .questions
                .into_iter()
                .map(QuestionDraft::validate)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| BankError::InvalidQuestion {
                    quiz: quiz.id,
                    source,
                })?;

            let definition = QuizDefinition {
                id: quiz.id,
                title: quiz.title,
                questions,
            };
            if quizzes.insert(quiz.id, definition).is_some() {
                return Err(BankError::DuplicateQuiz(quiz.id));
            }
        }

        Ok(Self { quizzes })
    }

    /// Build a bank from already validated quizzes. Later duplicates replace earlier ones.
    #[must_use]
    pub fn from_quizzes(quizzes: impl IntoIterator<Item = (QuizId, String, Vec<Question>)>) -> Self {
        let quizzes = quizzes
            .into_iter()
            .map(|(id, title, questions)| {
                (
                    id,
                    QuizDefinition {
                        id,
                        title,
                        questions,
                    },
                )
            })
            .collect();
        Self { quizzes }
    }

    #[must_use]
    pub fn get(&self, id: QuizId) -> Option<&QuizDefinition> {
        self.quizzes.get(&id)
    }

    #[must_use]
    pub fn title(&self, id: QuizId) -> Option<&str> {
        self.get(id).map(QuizDefinition::title)
    }

    #[must_use]
    pub fn questions(&self, id: QuizId) -> Option<&[Question]> {
        self.get(id).map(QuizDefinition::questions)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuizDefinition> {
        self.quizzes.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }
}

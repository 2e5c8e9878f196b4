use thiserror::Error;

use crate::model::{BankError, QuestionError, SnapshotError};

/// Any validation failure raised by the core model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionBank, QuizId};

    #[test]
    fn bank_errors_convert_and_keep_their_message() {
        let bank_err = QuestionBank::from_json(r#"{"quizzes":[{"id":4,"title":"x","questions":[]}]}"#)
            .unwrap_err();
        assert!(matches!(bank_err, BankError::EmptyQuiz(id) if id == QuizId::new(4)));
        let message = bank_err.to_string();

        let err: Error = bank_err.into();
        assert!(matches!(err, Error::Bank(_)));
        assert_eq!(err.to_string(), message);
    }
}

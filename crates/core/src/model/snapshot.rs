use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::Question;
use crate::model::result::{Answers, Notes};

/// Schema version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("saved progress is malformed: {0}")]
    Malformed(String),

    #[error("saved progress has unsupported version {found} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("saved progress does not match the quiz: {0}")]
    Inconsistent(String),
}

/// Resumable copy of an in-progress session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub version: u32,
    pub answers: Answers,
    pub current_question_index: usize,
    pub time_left_secs: u32,
    #[serde(default)]
    pub notes: Notes,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u32>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(
        answers: Answers,
        current_question_index: usize,
        time_left_secs: u32,
        notes: Notes,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            answers,
            current_question_index,
            time_left_secs,
            notes,
        }
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Malformed` if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// Decode from JSON, checking the version tag before the body.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::UnsupportedVersion` for any version other than
    /// [`SNAPSHOT_VERSION`] and `SnapshotError::Malformed` for anything that
    /// does not parse.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let probe: VersionProbe =
            serde_json::from_str(json).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        match probe.version {
            Some(SNAPSHOT_VERSION) => {}
            Some(found) => return Err(SnapshotError::UnsupportedVersion { found }),
            None => return Err(SnapshotError::Malformed("missing version".into())),
        }
        serde_json::from_str(json).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// Check that the snapshot can be applied to `questions` under a session of
    /// `duration_secs`.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Inconsistent` describing the first mismatch.
    pub fn validate_against(
        &self,
        questions: &[Question],
        duration_secs: u32,
    ) -> Result<(), SnapshotError> {
        if self.current_question_index >= questions.len() {
            return Err(SnapshotError::Inconsistent(format!(
                "question index {} out of range for {} questions",
                self.current_question_index,
                questions.len()
            )));
        }
        if self.time_left_secs > duration_secs {
            return Err(SnapshotError::Inconsistent(format!(
                "{}s left exceeds the {duration_secs}s duration",
                self.time_left_secs
            )));
        }
        for (&question, &option) in &self.answers {
            let selectable = questions
                .get(question)
                .is_some_and(|q| q.is_selectable(option));
            if !selectable {
                return Err(SnapshotError::Inconsistent(format!(
                    "answer {option} for question {question} is not a valid option"
                )));
            }
        }
        if let Some(&question) = self.notes.keys().find(|&&idx| idx >= questions.len()) {
            return Err(SnapshotError::Inconsistent(format!(
                "note for unknown question {question}"
            )));
        }
        Ok(())
    }
}

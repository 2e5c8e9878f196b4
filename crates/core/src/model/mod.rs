mod bank;
mod config;
mod ids;
pub mod league;
mod question;
mod result;
mod snapshot;

pub use ids::{ParseIdError, QuestionId, QuizId};

pub use bank::{BankError, QuestionBank, QuizDefinition};
pub use config::SessionConfig;
pub use league::League;
pub use question::{Question, QuestionDraft, QuestionError};
pub use result::{Answers, Notes, QuizResult};
pub use snapshot::{ProgressSnapshot, SNAPSHOT_VERSION, SnapshotError};

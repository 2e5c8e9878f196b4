use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{ProgressSnapshot, Question, QuestionId, QuizId, SessionConfig};
use services::{HintError, HintProvider, Lifecycle, QuizLoopService, SessionError};
use storage::repository::{InMemoryRepository, ProgressRepository, StorageError};

struct NoHints;

#[async_trait]
impl HintProvider for NoHints {
    async fn ask_hint(&self, _question: &str, _options: &[String]) -> Result<String, HintError> {
        Err(HintError::Disabled)
    }
}

/// Progress store whose writes take longer than the remaining exam time.
struct SlowSave {
    repo: InMemoryRepository,
    delay: Duration,
}

#[async_trait]
impl ProgressRepository for SlowSave {
    async fn load_progress(&self, quiz_id: QuizId) -> Result<Option<ProgressSnapshot>, StorageError> {
        self.repo.load_progress(quiz_id).await
    }

    async fn save_progress(
        &self,
        quiz_id: QuizId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.repo.save_progress(quiz_id, snapshot).await
    }

    async fn remove_progress(&self, quiz_id: QuizId) -> Result<(), StorageError> {
        self.repo.remove_progress(quiz_id).await
    }
}

fn questions(correct: &[usize]) -> Vec<Question> {
    correct
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Question::new(
                QuestionId::new(i as u64 + 1),
                format!("سؤال {i}"),
                vec!["أ".into(), "ب".into(), "ج".into(), "د".into()],
                c,
            )
            .unwrap()
        })
        .collect()
}

fn service(repo: &InMemoryRepository, config: SessionConfig) -> QuizLoopService {
    QuizLoopService::new(Arc::new(repo.clone()), Arc::new(NoHints)).with_config(config)
}

const QUIZ: QuizId = QuizId::new(1);

#[tokio::test(start_paused = true)]
async fn scores_two_of_three_and_emits_once() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default().with_instant_feedback(false))
        .open(QUIZ, questions(&[0, 1, 2]))
        .unwrap();

    let completion = runner.start().await.unwrap();
    runner.select_answer(0, 0);
    runner.select_answer(1, 1);
    runner.select_answer(2, 1);

    let result = runner.finish().await.unwrap();
    assert_eq!(result.score(), 2);
    assert_eq!(result.total(), 3);
    assert!(runner.finish().await.is_none());
    assert_eq!(runner.lifecycle(), Lifecycle::Finished);
    assert!(!runner.is_ticking());

    assert_eq!(completion.await, Some(result));
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_finishes_exactly_once() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default().with_duration_secs(5))
        .open(QUIZ, questions(&[0, 1]))
        .unwrap();

    let completion = runner.start().await.unwrap();
    runner.select_current(0);
    repo.insert_raw_progress(QUIZ, "{}").unwrap();

    let result = completion.await.unwrap();
    assert_eq!(result.time_spent_secs(), 5);
    assert_eq!(result.score(), 1);
    assert_eq!(runner.lifecycle(), Lifecycle::Finished);
    assert_eq!(runner.time_left_secs(), 0);
    assert!(runner.finish().await.is_none());
    assert!(!repo.has_raw_progress(QUIZ));
}

#[tokio::test(start_paused = true)]
async fn full_length_exam_with_no_answers_scores_zero() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0, 1, 2]))
        .unwrap();

    let completion = runner.start().await.unwrap();
    assert_eq!(runner.time_left_secs(), 4800);

    let result = completion.await.unwrap();
    assert_eq!(result.time_spent_secs(), 4800);
    assert_eq!(result.score(), 0);
}

#[tokio::test(start_paused = true)]
async fn countdown_ticks_once_per_second() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0]))
        .unwrap();

    let _completion = runner.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(runner.time_left_secs(), 4797);
    assert!(runner.is_ticking());
}

#[tokio::test(start_paused = true)]
async fn save_and_resume_restores_state() {
    let repo = InMemoryRepository::new();
    let loop_svc = service(&repo, SessionConfig::default().with_instant_feedback(false));
    let runner = loop_svc.open(QUIZ, questions(&[0, 1, 2, 3])).unwrap();

    let completion = runner.start().await.unwrap();
    runner.select_answer(0, 3);
    runner.select_answer(2, 2);
    runner.set_note(1, "النسبة ٣ : ٤");
    runner.go_to(2);
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    runner.save_and_exit().await.unwrap();
    assert!(!runner.is_ticking());
    assert_eq!(runner.lifecycle(), Lifecycle::Running);
    assert_eq!(completion.await, None);
    let saved = runner.read(|s| s.snapshot()).unwrap();
    drop(runner);

    let resumed = loop_svc.open(QUIZ, questions(&[0, 1, 2, 3])).unwrap();
    assert!(resumed.has_saved_progress().await.unwrap());
    let _completion = resumed.resume().await.unwrap().expect("snapshot to resume");

    assert_eq!(resumed.lifecycle(), Lifecycle::Running);
    assert_eq!(resumed.current_index(), 2);
    assert_eq!(resumed.time_left_secs(), 4798);
    assert_eq!(resumed.read(|s| s.snapshot()), Some(saved));
    assert_eq!(resumed.read(|s| s.note(1).map(str::to_owned)).as_deref(), Some("النسبة ٣ : ٤"));
}

#[tokio::test]
async fn resume_without_snapshot_is_nothing_to_resume() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0]))
        .unwrap();

    assert!(!runner.has_saved_progress().await.unwrap());
    assert!(runner.resume().await.unwrap().is_none());
    assert_eq!(runner.lifecycle(), Lifecycle::NotStarted);
}

#[tokio::test]
async fn corrupt_or_future_snapshot_is_discarded() {
    for payload in [
        "{not json",
        r#"{"version":2,"answers":{},"currentQuestionIndex":0,"timeLeftSecs":10,"notes":{}}"#,
    ] {
        let repo = InMemoryRepository::new();
        repo.insert_raw_progress(QUIZ, payload).unwrap();
        let runner = service(&repo, SessionConfig::default())
            .open(QUIZ, questions(&[0, 1]))
            .unwrap();

        assert!(!runner.has_saved_progress().await.unwrap());
        assert!(runner.resume().await.unwrap().is_none());
        assert_eq!(runner.lifecycle(), Lifecycle::NotStarted);
        assert!(!repo.has_raw_progress(QUIZ));
    }
}

#[tokio::test]
async fn snapshot_for_a_different_quiz_shape_is_not_resumed() {
    let repo = InMemoryRepository::new();
    let other = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0, 0, 0, 0, 0]))
        .unwrap();
    let _c = other.start().await.unwrap();
    other.go_to(4);
    other.save_and_exit().await.unwrap();
    drop(other);

    let runner = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0, 1]))
        .unwrap();
    assert!(!runner.has_saved_progress().await.unwrap());
    assert!(runner.resume().await.unwrap().is_none());
    assert_eq!(runner.lifecycle(), Lifecycle::NotStarted);
}

#[tokio::test]
async fn start_discards_stale_snapshot() {
    let repo = InMemoryRepository::new();
    let loop_svc = service(&repo, SessionConfig::default());
    let first = loop_svc.open(QUIZ, questions(&[0, 1])).unwrap();
    let _c = first.start().await.unwrap();
    first.save_and_exit().await.unwrap();
    drop(first);
    assert!(repo.load_progress(QUIZ).await.unwrap().is_some());

    let second = loop_svc.open(QUIZ, questions(&[0, 1])).unwrap();
    let _c = second.start().await.unwrap();
    assert!(repo.load_progress(QUIZ).await.unwrap().is_none());
    assert_eq!(second.time_left_secs(), 4800);
}

#[tokio::test]
async fn lifecycle_calls_from_wrong_state_are_rejected() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0]))
        .unwrap();

    let err = runner.save_and_exit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidTransition {
            from: Lifecycle::NotStarted,
            ..
        }
    ));
    assert!(runner.finish().await.is_none());
    assert!(!runner.restart());

    let _c = runner.start().await.unwrap();
    assert!(matches!(
        runner.start().await,
        Err(SessionError::InvalidTransition { .. })
    ));
    assert!(matches!(
        runner.resume().await,
        Err(SessionError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn navigation_clamps_to_last_question() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0, 0, 0, 0, 0]))
        .unwrap();

    assert_eq!(runner.go_to(3), None);
    let _c = runner.start().await.unwrap();
    assert_eq!(runner.go_to(99), Some(4));
    assert!(runner.progress().is_last_question());
    assert_eq!(runner.previous(), Some(3));
}

#[tokio::test]
async fn instant_feedback_locks_and_revision_overwrites() {
    let repo = InMemoryRepository::new();
    let locked = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[1]))
        .unwrap();
    let _c = locked.start().await.unwrap();
    let feedback = locked.select_current(0).unwrap();
    assert!(!feedback.is_correct && feedback.locked);
    assert!(locked.select_current(1).is_none());
    assert_eq!(locked.progress().questions[0].correct, Some(false));

    let free = service(&repo, SessionConfig::default())
        .open(QuizId::new(2), questions(&[1]))
        .unwrap();
    assert!(free.set_instant_feedback(false));
    let _c = free.start().await.unwrap();
    free.select_current(0);
    let feedback = free.select_current(1).unwrap();
    assert!(feedback.is_correct && !feedback.locked);
    assert_eq!(free.finish().await.unwrap().score(), 1);
}

#[tokio::test]
async fn restart_allows_a_new_attempt() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0]))
        .unwrap();

    let first = runner.start().await.unwrap();
    runner.select_current(0);
    runner.finish().await.unwrap();
    assert!(first.await.is_some());

    assert!(runner.restart());
    assert_eq!(runner.lifecycle(), Lifecycle::NotStarted);
    let second = runner.start().await.unwrap();
    assert_eq!(runner.finish().await.unwrap().score(), 0);
    assert_eq!(second.await.unwrap().score(), 0);
}

#[tokio::test(start_paused = true)]
async fn expiry_during_save_submits_and_leaves_no_snapshot() {
    let repo = InMemoryRepository::new();
    let slow = SlowSave {
        repo: repo.clone(),
        delay: Duration::from_secs(3),
    };
    let runner = QuizLoopService::new(Arc::new(slow), Arc::new(NoHints))
        .with_config(SessionConfig::default().with_duration_secs(2))
        .open(QUIZ, questions(&[0]))
        .unwrap();

    let completion = runner.start().await.unwrap();
    let err = runner.save_and_exit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidTransition {
            from: Lifecycle::Finished,
            ..
        }
    ));
    assert_eq!(runner.lifecycle(), Lifecycle::Finished);
    assert!(!repo.has_raw_progress(QUIZ));
    assert!(!runner.has_saved_progress().await.unwrap());

    let result = completion.await.unwrap();
    assert_eq!(result.time_spent_secs(), 2);
    assert_eq!(result.score(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_runner_stops_the_attempt() {
    let repo = InMemoryRepository::new();
    let runner = service(&repo, SessionConfig::default())
        .open(QUIZ, questions(&[0]))
        .unwrap();

    let completion = runner.start().await.unwrap();
    drop(runner);
    assert_eq!(completion.await, None);
}

#[test]
fn empty_quiz_cannot_be_opened() {
    let repo = InMemoryRepository::new();
    let err = service(&repo, SessionConfig::default())
        .open(QUIZ, Vec::new())
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::Empty));
}

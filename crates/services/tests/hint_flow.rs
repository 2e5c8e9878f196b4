use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{Question, QuestionId, QuizId, SessionConfig};
use services::{HintError, HintOutcome, HintProvider, HintState, QuizLoopService, QuizRunner};
use storage::repository::InMemoryRepository;
use tokio::sync::Notify;

/// Answers after `gate` is notified, echoing the question text.
struct GatedHints {
    gate: Arc<Notify>,
    calls: AtomicUsize,
}

#[async_trait]
impl HintProvider for GatedHints {
    async fn ask_hint(&self, question: &str, options: &[String]) -> Result<String, HintError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(format!("{question} ({} options)", options.len()))
    }
}

/// Never answers in time.
struct SlowHints;

#[async_trait]
impl HintProvider for SlowHints {
    async fn ask_hint(&self, _question: &str, _options: &[String]) -> Result<String, HintError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok("too late".into())
    }
}

fn questions() -> Vec<Question> {
    (0..3)
        .map(|i| {
            Question::new(
                QuestionId::new(i + 1),
                format!("Q{i}"),
                vec!["a".into(), String::new(), "c".into()],
                0,
            )
            .unwrap()
        })
        .collect()
}

fn runner(provider: Arc<dyn HintProvider>) -> QuizRunner {
    QuizLoopService::new(Arc::new(InMemoryRepository::new()), provider)
        .with_config(SessionConfig::default())
        .with_hint_timeout(Duration::from_secs(20))
        .open(QuizId::new(1), questions())
        .unwrap()
}

async fn wait_for_loading(runner: &QuizRunner, index: usize) {
    while runner.hint_state(index) != HintState::Loading {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn hint_is_stored_for_the_current_question() {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(GatedHints {
        gate: Arc::clone(&gate),
        calls: AtomicUsize::new(0),
    });
    let runner = runner(provider.clone());
    let _c = runner.start().await.unwrap();

    gate.notify_one();
    let outcome = runner.request_hint().await;
    // blank options are not sent
    assert_eq!(outcome, HintOutcome::Ready("Q0 (2 options)".into()));
    assert_eq!(runner.hint_state(0), HintState::Ready("Q0 (2 options)".into()));

    assert_eq!(runner.request_hint().await, HintOutcome::Skipped);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hint_before_start_is_skipped() {
    let runner = runner(Arc::new(SlowHints));
    assert_eq!(runner.request_hint().await, HintOutcome::Skipped);
    assert_eq!(runner.hint_state(0), HintState::Idle);
}

#[tokio::test]
async fn hint_for_a_question_left_behind_is_discarded() {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(GatedHints {
        gate: Arc::clone(&gate),
        calls: AtomicUsize::new(0),
    });
    let runner = runner(provider);
    let _c = runner.start().await.unwrap();

    let pending = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.request_hint().await })
    };
    wait_for_loading(&runner, 0).await;
    assert_eq!(runner.request_hint().await, HintOutcome::Skipped);

    runner.next();
    gate.notify_one();

    assert_eq!(pending.await.unwrap(), HintOutcome::Discarded);
    assert_eq!(runner.hint_state(0), HintState::Idle);
    assert_eq!(runner.hint_state(1), HintState::Idle);
    assert_eq!(runner.current_index(), 1);
}

#[tokio::test]
async fn hint_arriving_after_finish_is_discarded() {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(GatedHints {
        gate: Arc::clone(&gate),
        calls: AtomicUsize::new(0),
    });
    let runner = runner(provider);
    let completion = runner.start().await.unwrap();

    let pending = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.request_hint().await })
    };
    wait_for_loading(&runner, 0).await;
    let result = runner.finish().await.unwrap();
    gate.notify_one();

    assert_eq!(pending.await.unwrap(), HintOutcome::Discarded);
    assert_eq!(completion.await, Some(result));
}

#[tokio::test(start_paused = true)]
async fn slow_hint_times_out_and_can_be_retried() {
    let runner = runner(Arc::new(SlowHints));
    let _c = runner.start().await.unwrap();

    let outcome = runner.request_hint().await;
    let HintOutcome::Failed(message) = &outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("did not answer"));
    assert!(matches!(runner.hint_state(0), HintState::Failed(_)));
    // the countdown kept running while waiting
    assert!(runner.time_left_secs() <= 4800 - 19);

    assert!(matches!(runner.request_hint().await, HintOutcome::Failed(_)));
}

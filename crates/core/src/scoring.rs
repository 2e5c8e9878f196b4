//! Pure scoring helpers shared by the session engine and history views.

use crate::model::{Answers, Question, QuizResult};

/// Count answers matching the correct option. Unanswered questions and
/// answers keyed past the end of `questions` never count.
#[must_use]
pub fn score_answers(questions: &[Question], answers: &Answers) -> u32 {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(idx, q)| answers.get(idx).is_some_and(|&chosen| q.is_correct(chosen)))
        .count();
    u32::try_from(correct).unwrap_or(u32::MAX)
}

/// Elapsed seconds, clamped to `[0, duration_secs]`.
#[must_use]
pub fn time_spent(duration_secs: u32, time_left_secs: u32) -> u32 {
    duration_secs.saturating_sub(time_left_secs.min(duration_secs))
}

/// Build the result for a finished attempt.
#[must_use]
pub fn build_result(
    questions: &[Question],
    answers: &Answers,
    duration_secs: u32,
    time_left_secs: u32,
) -> QuizResult {
    let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    QuizResult::new(
        score_answers(questions, answers),
        total,
        answers.clone(),
        time_spent(duration_secs, time_left_secs),
    )
}

/// `m:ss` with zero-padded seconds, e.g. `80:00`, `4:05`.
#[must_use]
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn three_questions() -> Vec<Question> {
        (0..3_usize)
            .map(|i| {
                Question::new(
                    QuestionId::new(i as u64),
                    format!("Q{i}"),
                    vec!["a".into(), "b".into(), "c".into()],
                    i,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn last_answer_wrong_scores_two_of_three() {
        let answers: Answers = [(0, 0), (1, 1), (2, 1)].into_iter().collect();
        let result = build_result(&three_questions(), &answers, 4800, 4000);
        assert_eq!(result.score(), 2);
        assert_eq!(result.total(), 3);
        assert_eq!(result.time_spent_secs(), 800);
    }

    #[test]
    fn unanswered_and_stray_keys_never_count() {
        let answers: Answers = [(1, 1), (9, 0)].into_iter().collect();
        assert_eq!(score_answers(&three_questions(), &answers), 1);
        assert_eq!(score_answers(&three_questions(), &Answers::new()), 0);
    }

    #[test]
    fn time_spent_is_clamped() {
        assert_eq!(time_spent(4800, 0), 4800);
        assert_eq!(time_spent(4800, 9000), 0);
    }

    #[test]
    fn clock_pads_seconds() {
        assert_eq!(format_clock(4800), "80:00");
        assert_eq!(format_clock(245), "4:05");
        assert_eq!(format_clock(0), "0:00");
    }
}

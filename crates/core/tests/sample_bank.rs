use quiz_core::model::{QuestionBank, QuizId};
use quiz_core::score_answers;

const SAMPLE: &str = include_str!("../../../data/sample_bank.json");

#[test]
fn bundled_sample_bank_loads() {
    let bank = QuestionBank::from_json(SAMPLE).expect("sample bank is valid");
    assert_eq!(bank.len(), 2);

    let analogies = bank.get(QuizId::new(1)).unwrap();
    assert_eq!(analogies.questions().len(), 3);
    // null option slots keep their position but are never offered
    let second = &analogies.questions()[1];
    assert_eq!(second.options().len(), 4);
    assert!(!second.is_selectable(3));
    assert_eq!(second.visible_options().count(), 3);
}

#[test]
fn perfect_run_over_sample_quiz() {
    let bank = QuestionBank::from_json(SAMPLE).unwrap();
    let questions = bank.questions(QuizId::new(2)).unwrap();
    let answers = questions
        .iter()
        .enumerate()
        .map(|(i, q)| (i, q.correct_answer_index()))
        .collect();
    assert_eq!(score_answers(questions, &answers), 2);
}
